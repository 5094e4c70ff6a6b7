//! TLSH digests.
//!
//! Standard TLSH construction: a 5-byte window slides over the content, six
//! Pearson-hashed triplets per position update a 128-bucket histogram, and
//! the digest body encodes each bucket as a 2-bit quartile code. Only the
//! 64-hex-char body is produced here; the header (version, checksum, length
//! bucket) adds no ordering signal and the sort keys strip it anyway.
//! Similar inputs produce bodies differing in few positions, so a plain
//! lexicographic sort co-locates them.

const WINDOW: usize = 5;
const BUCKETS: usize = 128;
const CODE_SIZE: usize = 32;
/// TLSH is undefined below this input length.
const MIN_DATA_LEN: usize = 50;

/// Pearson permutation table ("Fast Hashing of Variable-Length Text
/// Strings", CACM 1990), as used by the TLSH reference implementation.
#[rustfmt::skip]
const PEARSON: [u8; 256] = [
    1, 87, 49, 12, 176, 178, 102, 166, 121, 193, 6, 84, 249, 230, 44, 163,
    14, 197, 213, 181, 161, 85, 218, 80, 64, 239, 24, 226, 236, 142, 38, 200,
    110, 177, 104, 103, 141, 253, 255, 50, 77, 101, 81, 18, 45, 96, 31, 222,
    25, 107, 190, 70, 86, 237, 240, 34, 72, 242, 20, 214, 244, 227, 149, 235,
    97, 234, 57, 22, 60, 250, 82, 175, 208, 5, 127, 199, 111, 62, 135, 248,
    174, 169, 211, 58, 66, 154, 106, 195, 245, 171, 17, 187, 182, 179, 0, 243,
    132, 56, 148, 75, 128, 133, 158, 100, 130, 126, 91, 13, 153, 246, 216, 219,
    119, 68, 223, 78, 83, 88, 201, 99, 122, 11, 92, 32, 136, 114, 52, 10,
    138, 30, 48, 183, 156, 35, 61, 26, 143, 74, 251, 94, 129, 162, 63, 152,
    170, 7, 115, 167, 241, 206, 3, 150, 55, 59, 151, 220, 90, 53, 23, 131,
    125, 173, 15, 238, 79, 95, 89, 16, 105, 137, 225, 224, 217, 160, 37, 123,
    118, 73, 2, 157, 46, 116, 9, 145, 134, 228, 207, 212, 202, 215, 69, 229,
    27, 188, 67, 124, 168, 252, 42, 4, 29, 108, 21, 247, 19, 205, 39, 203,
    233, 40, 186, 147, 198, 192, 155, 33, 164, 191, 98, 204, 165, 180, 117, 76,
    140, 36, 210, 172, 41, 54, 159, 8, 185, 232, 113, 196, 231, 47, 146, 120,
    51, 65, 28, 144, 254, 221, 93, 189, 194, 139, 112, 43, 71, 109, 184, 209,
];

fn b_mapping(salt: u8, i: u8, j: u8, k: u8) -> u8 {
    let mut h = PEARSON[salt as usize];
    h = PEARSON[(h ^ i) as usize];
    h = PEARSON[(h ^ j) as usize];
    h = PEARSON[(h ^ k) as usize];
    h
}

/// Compute the TLSH body for `data`: 64 uppercase hex chars, or the empty
/// string when the input is too short or too uniform to hash (mirroring the
/// reference library's null digest, whose stripped body is also empty).
#[must_use]
pub fn tlsh_body(data: &[u8]) -> String {
    if data.len() < MIN_DATA_LEN {
        return String::new();
    }

    let mut buckets = [0u32; 256];
    for w in data.windows(WINDOW) {
        // chunk[0] is the newest byte of the window
        let (c0, c1, c2, c3, c4) = (w[4], w[3], w[2], w[1], w[0]);
        buckets[b_mapping(2, c0, c1, c2) as usize] += 1;
        buckets[b_mapping(3, c0, c1, c3) as usize] += 1;
        buckets[b_mapping(5, c0, c2, c3) as usize] += 1;
        buckets[b_mapping(7, c0, c2, c4) as usize] += 1;
        buckets[b_mapping(11, c0, c1, c4) as usize] += 1;
        buckets[b_mapping(13, c0, c3, c4) as usize] += 1;
    }

    let effective = &buckets[..BUCKETS];
    let nonzero = effective.iter().filter(|&&c| c != 0).count();
    if nonzero <= BUCKETS / 2 {
        return String::new();
    }

    let mut sorted = [0u32; BUCKETS];
    sorted.copy_from_slice(effective);
    sorted.sort_unstable();
    let q1 = sorted[BUCKETS / 4 - 1];
    let q2 = sorted[BUCKETS / 2 - 1];
    let q3 = sorted[3 * BUCKETS / 4 - 1];
    if q3 == 0 {
        return String::new();
    }

    let mut code = [0u8; CODE_SIZE];
    for (i, byte) in code.iter_mut().enumerate() {
        let mut packed = 0u8;
        for j in 0..4 {
            let count = effective[4 * i + j];
            let cell = if count > q3 {
                3
            } else if count > q2 {
                2
            } else if count > q1 {
                1
            } else {
                0
            };
            packed |= cell << (j * 2);
        }
        *byte = packed;
    }

    // The reference digest emits the code bytes last-to-first
    let mut body = String::with_capacity(CODE_SIZE * 2);
    for byte in code.iter().rev() {
        body.push_str(&format!("{byte:02X}"));
    }
    body
}
