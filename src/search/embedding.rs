//! Embedding function
//!
//! The engine only sees the [`Embedder`] trait: text in, fixed-length vector
//! out, deterministic and side-effect free. The bundled [`HtpEmbedder`] is a
//! training-free Harmonic Token Projection model, so the vector path works
//! without downloading model weights.

use async_trait::async_trait;
use std::f64::consts::PI;

use crate::core::error::{Result, RetrievalError};

/// Default embedding dimension (matches all-MiniLM-L6-v2)
pub const EMBEDDING_DIM: usize = 384;

/// Maximum token length (Unicode code points)
const MAX_TOKEN_LENGTH: usize = 64;

/// Moduli used at the default dimension; each contributes a sin/cos pair
const NUM_MODULI: usize = EMBEDDING_DIM / 2;

/// Leading primes, of which the first `NUM_MODULI` are used
static COPRIME_MODULI: &[u64] = &[
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71,
    73, 79, 83, 89, 97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151,
    157, 163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223, 227, 229, 233,
    239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307, 311, 313, 317,
    331, 337, 347, 349, 353, 359, 367, 373, 379, 383, 389, 397, 401, 409, 419,
    421, 431, 433, 439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503,
    509, 521, 523, 541, 547, 557, 563, 569, 571, 577, 587, 593, 599, 601, 607,
    613, 617, 619, 631, 641, 643, 647, 653, 659, 661, 673, 677, 683, 691, 701,
    709, 719, 727, 733, 739, 743, 751, 757, 761, 769, 773, 787, 797, 809, 811,
    821, 823, 827, 829, 839, 853, 857, 859, 863, 877, 881, 883, 887, 907, 911,
    919, 929, 937, 941, 947, 953, 967, 971, 977, 983, 991, 997, 1009, 1013,
    1019, 1021, 1031, 1033, 1039, 1049, 1051, 1061, 1063, 1069, 1087, 1091,
    1093, 1097, 1103, 1109, 1117, 1123, 1129, 1151, 1153, 1163, 1171, 1181,
];

/// Text → fixed-dimension vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. The result must have exactly `dimension()` entries.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimension(&self) -> usize;

    fn name(&self) -> &str;
}

/// Harmonic Token Projection embedder
#[derive(Debug, Clone)]
pub struct HtpEmbedder {
    moduli: Vec<u64>,
}

impl HtpEmbedder {
    /// Create an embedder producing `dimension`-length vectors.
    ///
    /// `dimension` must be even and at most [`EMBEDDING_DIM`].
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 || dimension % 2 != 0 || dimension > EMBEDDING_DIM {
            return Err(RetrievalError::config(format!(
                "embedding dimension must be an even number between 2 and {}, got {}",
                EMBEDDING_DIM, dimension
            )));
        }
        Ok(Self {
            moduli: COPRIME_MODULI[..dimension / 2].to_vec(),
        })
    }

    /// Synchronous embedding
    ///
    /// Tokens are embedded independently, mean pooled, then L2 normalized.
    /// Text without tokens maps to the zero vector.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let dim = self.moduli.len() * 2;
        let tokens = tokenize(text);

        if tokens.is_empty() {
            return vec![0.0; dim];
        }

        let mut sum_embedding = vec![0.0f64; dim];
        for token in &tokens {
            for (i, val) in self.embed_token(token).iter().enumerate() {
                sum_embedding[i] += val;
            }
        }

        let count = tokens.len() as f64;
        for val in &mut sum_embedding {
            *val /= count;
        }

        let norm: f64 = sum_embedding.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            sum_embedding.iter().map(|x| (*x / norm) as f32).collect()
        } else {
            sum_embedding.iter().map(|x| *x as f32).collect()
        }
    }

    /// E_i = [sin(2πr_i/m_i), cos(2πr_i/m_i)] with r_i = N mod m_i
    fn embed_token(&self, token: &str) -> Vec<f64> {
        let n = token_to_integer(token);
        let mut embedding = Vec::with_capacity(self.moduli.len() * 2);

        for &m in &self.moduli {
            let theta = 2.0 * PI * ((n % m) as f64) / (m as f64);
            embedding.push(theta.sin());
            embedding.push(theta.cos());
        }

        embedding
    }
}

impl Default for HtpEmbedder {
    fn default() -> Self {
        Self {
            moduli: COPRIME_MODULI[..NUM_MODULI].to_vec(),
        }
    }
}

#[async_trait]
impl Embedder for HtpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimension(&self) -> usize {
        self.moduli.len() * 2
    }

    fn name(&self) -> &str {
        "htp"
    }
}

/// N = Σ u_j * B^(L-j) where B = 2^16, wrapping on overflow
fn token_to_integer(token: &str) -> u64 {
    token
        .chars()
        .take(MAX_TOKEN_LENGTH)
        .fold(0u64, |n, c| n.wrapping_mul(65536).wrapping_add(c as u64))
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Cosine similarity between two embeddings, 0.0 for degenerate input
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}
