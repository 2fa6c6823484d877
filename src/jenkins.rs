//! Bob Jenkins' lookup3 mixing (public domain, May 2006).
//!
//! `hash_words` is lookup3's `hashword`; `hash_bytes` packs bytes into
//! little-endian words and also folds the byte length into the seed, so
//! inputs differing only in trailing zero bytes hash apart.

#[inline]
pub fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(4);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(6);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(8);
    *b = b.wrapping_add(*a);
    *a = a.wrapping_sub(*c);
    *a ^= c.rotate_left(16);
    *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a);
    *b ^= a.rotate_left(19);
    *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b);
    *c ^= b.rotate_left(4);
    *b = b.wrapping_add(*a);
}

#[inline]
pub fn finalize(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(14));
    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(11));
    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(25));
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(16));
    *a ^= *c;
    *a = a.wrapping_sub(c.rotate_left(4));
    *b ^= *a;
    *b = b.wrapping_sub(a.rotate_left(14));
    *c ^= *b;
    *c = c.wrapping_sub(b.rotate_left(24));
}

fn hash_stream<I>(mut words: I, n: usize, initval: u32) -> u32
where
    I: Iterator<Item = u32>,
{
    let init = 0xdead_beef_u32
        .wrapping_add((n as u32) << 2)
        .wrapping_add(initval);
    let (mut a, mut b, mut c) = (init, init, init);
    let mut next = || words.next().unwrap_or(0);
    let mut remaining = n;
    while remaining > 3 {
        a = a.wrapping_add(next());
        b = b.wrapping_add(next());
        c = c.wrapping_add(next());
        mix(&mut a, &mut b, &mut c);
        remaining -= 3;
    }
    if remaining == 0 {
        return c;
    }
    a = a.wrapping_add(next());
    if remaining > 1 {
        b = b.wrapping_add(next());
    }
    if remaining > 2 {
        c = c.wrapping_add(next());
    }
    finalize(&mut a, &mut b, &mut c);
    c
}

/// lookup3 `hashword` over `k`.
pub fn hash_words(k: &[u32], initval: u32) -> u32 {
    hash_stream(k.iter().copied(), k.len(), initval)
}

pub fn hash_bytes(bytes: &[u8], initval: u32) -> u32 {
    let n = (bytes.len() + 3) / 4;
    let words = bytes.chunks(4).map(|chunk| {
        let mut w = [0u8; 4];
        w[..chunk.len()].copy_from_slice(chunk);
        u32::from_le_bytes(w)
    });
    hash_stream(words, n, initval.wrapping_add(bytes.len() as u32))
}
