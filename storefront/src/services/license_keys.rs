// payhula-storefront/src/services/license_keys.rs

use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const GROUPS: usize = 4;
const GROUP_LEN: usize = 4;

/// A key like `7KQ2-MZ0A-PX4D-91BC`. Uniform over the alphabet; not meant to
/// be unguessable.
pub fn generate_license_key() -> String {
  let mut rng = rand::thread_rng();
  let mut key = String::with_capacity(GROUPS * (GROUP_LEN + 1));
  for group in 0..GROUPS {
    if group > 0 {
      key.push('-');
    }
    for _ in 0..GROUP_LEN {
      key.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
    }
  }
  key
}
