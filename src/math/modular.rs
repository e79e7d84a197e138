//! Modular arithmetic operations

/// Modular arithmetic operations over Z_q
pub struct ModQ;

impl ModQ {
    /// Add two values modulo q
    #[inline]
    pub fn add(a: u64, b: u64, q: u64) -> u64 {
        let sum = a + b;
        if sum >= q {
            sum - q
        } else {
            sum
        }
    }

    /// Subtract two values modulo q
    #[inline]
    pub fn sub(a: u64, b: u64, q: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            q - (b - a)
        }
    }

    /// Multiply two values modulo q
    #[inline]
    pub fn mul(a: u64, b: u64, q: u64) -> u64 {
        let prod = (a as u128) * (b as u128);
        (prod % (q as u128)) as u64
    }

    /// Negate a value modulo q
    #[inline]
    pub fn negate(a: u64, q: u64) -> u64 {
        if a == 0 {
            0
        } else {
            q - a
        }
    }

    /// Convert a signed integer to its representation in Z_q
    #[inline]
    pub fn from_signed(val: i64, q: u64) -> u64 {
        if val >= 0 {
            (val as u64) % q
        } else {
            let r = val.unsigned_abs() % q;
            if r == 0 {
                0
            } else {
                q - r
            }
        }
    }

    /// Convert from Z_q to signed representation in (-q/2, q/2]
    #[inline]
    pub fn to_signed(val: u64, q: u64) -> i64 {
        if val <= q / 2 {
            val as i64
        } else {
            -((q - val) as i64)
        }
    }

    /// Modular exponentiation by squaring
    pub fn pow(mut base: u64, mut exp: u64, q: u64) -> u64 {
        let mut result = 1u64 % q;
        base %= q;
        while exp > 0 {
            if exp & 1 == 1 {
                result = Self::mul(result, base, q);
            }
            exp >>= 1;
            base = Self::mul(base, base, q);
        }
        result
    }

    /// Multiplicative inverse, if `a` is invertible modulo q
    pub fn inverse(a: u64, q: u64) -> Option<u64> {
        super::crt::mod_inverse(a % q, q)
    }
}

/// Deterministic Miller-Rabin primality test for 64-bit integers.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    for &p in &WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }

    let mut d = n - 1;
    let mut r = 0;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }

    'witness: for &a in &WITNESSES {
        let mut x = ModQ::pow(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = ModQ::mul(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: u64 = 35184371884033;

    #[test]
    fn test_add() {
        assert_eq!(ModQ::add(5, 7, Q), 12);
        assert_eq!(ModQ::add(Q - 1, 2, Q), 1);
    }

    #[test]
    fn test_sub() {
        assert_eq!(ModQ::sub(10, 3, Q), 7);
        assert_eq!(ModQ::sub(3, 10, Q), Q - 7);
    }

    #[test]
    fn test_mul() {
        assert_eq!(ModQ::mul(5, 7, Q), 35);
        assert_eq!(ModQ::mul(Q - 1, Q - 1, Q), 1);
    }

    #[test]
    fn test_negate() {
        assert_eq!(ModQ::negate(5, Q), Q - 5);
        assert_eq!(ModQ::negate(0, Q), 0);
    }

    #[test]
    fn test_signed_roundtrip() {
        for v in [-3i64, -1, 0, 1, 42, -(Q as i64) / 2] {
            assert_eq!(ModQ::to_signed(ModQ::from_signed(v, Q), Q), v);
        }
        assert_eq!(ModQ::from_signed(-(Q as i64), Q), 0);
    }

    #[test]
    fn test_pow_and_inverse() {
        // Fermat: a^(q-1) = 1 for prime q
        assert_eq!(ModQ::pow(123456789, Q - 1, Q), 1);
        let inv = ModQ::inverse(123456789, Q).unwrap();
        assert_eq!(ModQ::mul(inv, 123456789, Q), 1);
        assert!(ModQ::inverse(0, Q).is_none());
    }

    #[test]
    fn test_is_prime() {
        assert!(is_prime(Q));
        assert!(is_prime(35184371703809));
        assert!(is_prime(3072001));
        assert!(is_prime(3022849));
        assert!(!is_prime(3072001 * 3));
        assert!(!is_prime(1));
        assert!(is_prime(2));
        // Carmichael number
        assert!(!is_prime(561));
    }
}
