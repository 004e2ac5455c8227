//! Token Counting
//!
//! BPE token counts for prompt budgeting, backed by tiktoken.
//!
//! ## Strategy
//! - Chat models (gpt-3.5 / gpt-4) use `cl100k_base`
//! - Legacy davinci models use `p50k_base`
//! - Counts are approximate; the budget reserves an overhead on top
//! - Each encoding's ranks are loaded once per process

use std::sync::{Arc, OnceLock};

use tiktoken_rs::CoreBPE;
use tracing::debug;

use super::deployment::RequestShape;
use crate::types::{AssistError, Result};

/// Something that can count tokens in a piece of text
pub trait TokenEncoder: Send + Sync {
    /// Number of tokens `text` encodes to
    fn count(&self, text: &str) -> Result<usize>;
}

/// BPE encoding families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Cl100kBase,
    P50kBase,
}

impl Encoding {
    /// Encoding used by a deployment's model family
    pub fn for_deployment(deployment: &str) -> Self {
        match RequestShape::classify(deployment) {
            RequestShape::Chat => Self::Cl100kBase,
            RequestShape::Completion => Self::P50kBase,
        }
    }
}

/// tiktoken-backed encoder
#[derive(Clone)]
pub struct BpeEncoder {
    encoding: Encoding,
    bpe: Arc<CoreBPE>,
}

impl BpeEncoder {
    /// Encoder over the shared BPE ranks, loading them on first use
    pub fn new(encoding: Encoding) -> Result<Self> {
        Ok(Self {
            encoding,
            bpe: shared_ranks(encoding)?,
        })
    }

    pub fn for_deployment(deployment: &str) -> Result<Self> {
        Self::new(Encoding::for_deployment(deployment))
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

static CL100K_BASE: OnceLock<Arc<CoreBPE>> = OnceLock::new();
static P50K_BASE: OnceLock<Arc<CoreBPE>> = OnceLock::new();

fn shared_ranks(encoding: Encoding) -> Result<Arc<CoreBPE>> {
    let cell = match encoding {
        Encoding::Cl100kBase => &CL100K_BASE,
        Encoding::P50kBase => &P50K_BASE,
    };
    if let Some(bpe) = cell.get() {
        return Ok(Arc::clone(bpe));
    }

    debug!("Loading {:?} tokenizer", encoding);
    let bpe = match encoding {
        Encoding::Cl100kBase => tiktoken_rs::cl100k_base(),
        Encoding::P50kBase => tiktoken_rs::p50k_base(),
    }
    .map_err(|e| AssistError::Encoding(format!("failed to load {:?}: {}", encoding, e)))?;

    // A concurrent first load may win; either copy is identical
    Ok(Arc::clone(cell.get_or_init(|| Arc::new(bpe))))
}

impl TokenEncoder for BpeEncoder {
    fn count(&self, text: &str) -> Result<usize> {
        Ok(self.bpe.encode_ordinary(text).len())
    }
}
