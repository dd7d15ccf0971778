
use crate::Result;
use crate::embeddings::Embedder;

pub const DEFAULT_DIMENSIONS: usize = 256;

/// Offline embedder: a hashed bag of lowercase words, L2-normalised.
///
/// Texts sharing words land close together, which is enough for
/// retrieval to behave sensibly without a model.
#[derive(Debug, Clone)]
pub struct FakeEmbedder {
    dimensions: usize,
}

impl Default for FakeEmbedder {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl FakeEmbedder {
    #[inline]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    #[inline]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = md5::compute(word.to_lowercase().as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]) % self.dimensions as u64;
            vector[bucket as usize] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Embedder for FakeEmbedder {
    #[inline]
    fn provider(&self) -> &str {
        "debug"
    }

    #[inline]
    fn model(&self) -> &str {
        "hashed-bow"
    }

    #[inline]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed(text))
    }

    #[inline]
    fn signature(&self) -> String {
        format!("debug:hashed-bow-{}", self.dimensions)
    }
}
