/// Reed-Solomon error correction for QR codes
/// QR codes use RS over GF(256) with primitive polynomial x^8 + x^4 + x^3 + x^2 + 1
use crate::decoder::tables::EcBlockInfo;
use crate::error::Rejection;
use log::trace;

const PRIMITIVE: u16 = 0x11D;

/// Doubled exp table so `mul` never needs a modulo
const fn build_tables() -> ([u8; 512], [u8; 256]) {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE;
        }
        i += 1;
    }
    while i < 512 {
        exp[i] = exp[i - 255];
        i += 1;
    }
    (exp, log)
}

const TABLES: ([u8; 512], [u8; 256]) = build_tables();
static EXP_TABLE: [u8; 512] = TABLES.0;
static LOG_TABLE: [u8; 256] = TABLES.1;

/// GF(256) field operations using log/exp tables
pub struct Gf256;

impl Gf256 {
    pub fn mul(a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        EXP_TABLE[LOG_TABLE[a as usize] as usize + LOG_TABLE[b as usize] as usize]
    }

    /// `a / b`; callers guarantee `b != 0`
    pub fn div(a: u8, b: u8) -> u8 {
        debug_assert!(b != 0, "division by zero in GF(256)");
        if a == 0 || b == 0 {
            return 0;
        }
        EXP_TABLE[LOG_TABLE[a as usize] as usize + 255 - LOG_TABLE[b as usize] as usize]
    }

    /// alpha^n
    pub fn exp(n: usize) -> u8 {
        EXP_TABLE[n % 255]
    }

    /// alpha^-n
    pub fn exp_inv(n: usize) -> u8 {
        EXP_TABLE[(255 - n % 255) % 255]
    }

    /// Evaluate a polynomial given lowest degree first
    fn eval_ascending(poly: &[u8], x: u8) -> u8 {
        poly.iter().rev().fold(0, |acc, &c| Gf256::mul(acc, x) ^ c)
    }
}

/// Reed-Solomon decoder for QR codes
///
/// Codeword byte 0 is the coefficient of the highest power; the generator has
/// roots alpha^0 .. alpha^(ecc-1).
pub struct ReedSolomonDecoder {
    num_ecc_codewords: usize,
}

impl ReedSolomonDecoder {
    pub fn new(num_ecc_codewords: usize) -> Self {
        Self { num_ecc_codewords }
    }

    /// Correct `received` in place, returning the number of bytes repaired.
    ///
    /// `None` when the block holds more errors than the parity can locate, or when
    /// the corrected block still fails the syndrome check.
    pub fn decode(&self, received: &mut [u8]) -> Option<usize> {
        let syndromes = self.syndromes(received);
        if syndromes.iter().all(|&s| s == 0) {
            return Some(0);
        }

        let locator = self.error_locator(&syndromes)?;
        let positions = Self::error_positions(&locator, received.len())?;
        let evaluator = Self::error_evaluator(&syndromes, &locator);
        let n = received.len();

        for &pos in &positions {
            let power = n - 1 - pos;
            let x_inv = Gf256::exp_inv(power);
            // Formal derivative keeps only odd terms
            let derivative = locator
                .iter()
                .enumerate()
                .skip(1)
                .step_by(2)
                .fold(0u8, |acc, (i, &c)| {
                    acc ^ Gf256::mul(c, Gf256::exp_inv(power * (i - 1)))
                });
            if derivative == 0 {
                return None;
            }
            let omega = Gf256::eval_ascending(&evaluator, x_inv);
            received[pos] ^= Gf256::mul(Gf256::exp(power), Gf256::div(omega, derivative));
        }

        if self.syndromes(received).iter().any(|&s| s != 0) {
            return None;
        }
        Some(positions.len())
    }

    fn syndromes(&self, received: &[u8]) -> Vec<u8> {
        (0..self.num_ecc_codewords)
            .map(|i| {
                let x = Gf256::exp(i);
                received.iter().fold(0u8, |acc, &c| Gf256::mul(acc, x) ^ c)
            })
            .collect()
    }

    /// Berlekamp-Massey; lowest degree first, trailing zeros trimmed
    fn error_locator(&self, syndromes: &[u8]) -> Option<Vec<u8>> {
        let mut lambda = vec![1u8];
        let mut prev = vec![1u8];
        let mut prev_discrepancy = 1u8;
        let mut degree = 0usize;
        let mut shift = 1usize;

        for k in 0..syndromes.len() {
            let mut delta = syndromes[k];
            for i in 1..=degree.min(lambda.len() - 1) {
                delta ^= Gf256::mul(lambda[i], syndromes[k - i]);
            }

            if delta == 0 {
                shift += 1;
                continue;
            }

            let coef = Gf256::div(delta, prev_discrepancy);
            let snapshot = lambda.clone();
            if lambda.len() < prev.len() + shift {
                lambda.resize(prev.len() + shift, 0);
            }
            for (j, &p) in prev.iter().enumerate() {
                lambda[j + shift] ^= Gf256::mul(coef, p);
            }

            if 2 * degree <= k {
                degree = k + 1 - degree;
                prev = snapshot;
                prev_discrepancy = delta;
                shift = 1;
            } else {
                shift += 1;
            }
        }

        while lambda.len() > 1 && lambda.last() == Some(&0) {
            lambda.pop();
        }
        let errors = lambda.len() - 1;
        if errors != degree || errors == 0 || 2 * errors > self.num_ecc_codewords {
            return None;
        }
        Some(lambda)
    }

    /// Chien search over the positions of the block
    fn error_positions(locator: &[u8], n: usize) -> Option<Vec<usize>> {
        let positions: Vec<usize> = (0..n)
            .filter(|&pos| Gf256::eval_ascending(locator, Gf256::exp_inv(n - 1 - pos)) == 0)
            .collect();
        (positions.len() == locator.len() - 1).then_some(positions)
    }

    /// Omega(x) = S(x) * Lambda(x) mod x^ecc
    fn error_evaluator(syndromes: &[u8], locator: &[u8]) -> Vec<u8> {
        let mut omega = vec![0u8; syndromes.len()];
        for (i, slot) in omega.iter_mut().enumerate() {
            for (j, &l) in locator.iter().enumerate().take(i + 1) {
                *slot ^= Gf256::mul(l, syndromes[i - j]);
            }
        }
        omega
    }
}

/// One Reed-Solomon block: its data codewords followed by its parity codewords
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodewordBlock {
    pub data_len: usize,
    pub codewords: Vec<u8>,
}

impl CodewordBlock {
    /// Undo the round-robin interleave.
    ///
    /// Data codewords are dealt one per block in turn, skipping short blocks
    /// once they are full; parity codewords follow the same way.
    pub fn deinterleave(codewords: &[u8], info: &EcBlockInfo) -> Option<Vec<CodewordBlock>> {
        if codewords.len() < info.total_codewords {
            return None;
        }

        let mut blocks: Vec<CodewordBlock> = (0..info.num_blocks)
            .map(|b| CodewordBlock {
                data_len: info.data_len(b),
                codewords: Vec::with_capacity(info.data_len(b) + info.ecc_per_block),
            })
            .collect();

        let mut source = codewords.iter().copied();
        let long_len = info.short_data_len() + 1;
        for i in 0..long_len {
            for block in blocks.iter_mut().filter(|b| i < b.data_len) {
                block.codewords.push(source.next()?);
            }
        }
        for _ in 0..info.ecc_per_block {
            for block in blocks.iter_mut() {
                block.codewords.push(source.next()?);
            }
        }

        Some(blocks)
    }

    pub fn data(&self) -> &[u8] {
        &self.codewords[..self.data_len]
    }
}

/// Corrected data codewords in block order, plus the total number of repaired bytes
pub fn deinterleave_and_correct(
    codewords: &[u8],
    info: &EcBlockInfo,
) -> Result<(Vec<u8>, usize), Rejection> {
    let mut blocks = CodewordBlock::deinterleave(codewords, info)
        .ok_or(Rejection::Bitstream("codeword count below block table"))?;

    let rs = ReedSolomonDecoder::new(info.ecc_per_block);
    let mut data = Vec::with_capacity(info.data_codewords());
    let mut corrected = 0;
    for (index, block) in blocks.iter_mut().enumerate() {
        let fixed = rs
            .decode(&mut block.codewords)
            .ok_or(Rejection::Ecc { block: index })?;
        if fixed > 0 {
            trace!("rs block {index}: corrected {fixed} codewords");
        }
        corrected += fixed;
        data.extend_from_slice(block.data());
    }

    Ok((data, corrected))
}
