//! Prints a random 256-bit hex secret for `SESSION_SECRET`.

use rand::rngs::OsRng;
use rand::RngCore;

fn secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn main() {
    println!("{}", secret());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_64_hex_chars_and_random() {
        let a = secret();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, secret());
    }
}
