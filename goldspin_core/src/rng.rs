use hmac::{Hmac, Mac};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::Sha256;

// Random source behind every symbol draw. Seeded sources make spins
// reproducible; nothing here is meant to be provably fair.

pub type HmacSha256 = Hmac<Sha256>;

pub trait SymbolRng {
    /// Uniform float in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` of zero or one yields 0.
    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        let idx = (self.next_f64() * len as f64).floor() as usize;
        idx.min(len - 1)
    }
}

impl<R: SymbolRng + ?Sized> SymbolRng for Box<R> {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

pub fn derive_hash_hex(input: &[u8]) -> String {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

pub fn derive_floats(bytes: &[u8]) -> Vec<f64> {
    // Successive 4-byte chunks -> u32 -> [0,1); a trailing partial chunk is dropped
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let v = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            (v as f64) / (u32::MAX as f64 + 1.0)
        })
        .collect()
}

/// Deterministic stream: HMAC-SHA256(seed, "block:{n}") yields 8 floats per block.
pub struct SeededStream {
    seed: String,
    block: u64,
    buffer: Vec<f64>,
}

impl SeededStream {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            block: 0,
            buffer: Vec::new(),
        }
    }

    pub fn seed_hash_hex(&self) -> String {
        derive_hash_hex(self.seed.as_bytes())
    }

    /// Blocks consumed so far.
    pub fn blocks(&self) -> u64 {
        self.block
    }

    fn block_bytes(&self, block: u64) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(self.seed.as_bytes()).expect("HMAC key");
        mac.update(format!("block:{block}").as_bytes());
        let res = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&res);
        out
    }

    fn refill(&mut self) {
        let bytes = self.block_bytes(self.block);
        self.block += 1;
        // pop() takes from the back, keep block order
        self.buffer = derive_floats(&bytes);
        self.buffer.reverse();
    }
}

impl SymbolRng for SeededStream {
    fn next_f64(&mut self) -> f64 {
        if self.buffer.is_empty() {
            self.refill();
        }
        self.buffer.pop().unwrap_or(0.0)
    }
}

/// General-purpose source backed by `StdRng`.
pub struct ThreadRandom(StdRng);

impl ThreadRandom {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl SymbolRng for ThreadRandom {
    fn next_f64(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Replays a fixed list of floats, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRng {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }

    /// A source whose every `pick(len)` lands on `index`.
    pub fn always(index: usize, len: usize) -> Self {
        let f = (index as f64 + 0.5) / len.max(1) as f64;
        Self::new(vec![f])
    }

    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl SymbolRng for ScriptedRng {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v.clamp(0.0, 0.999_999_999)
    }
}
