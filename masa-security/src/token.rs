use rand::distributions::Alphanumeric;
use rand::Rng;

/// Random URL-safe token for QR codes and password-reset links.
pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
