use rand::Rng;

pub const CODE_LEN: usize = 6;

/// Returns a zero-padded six digit code. Not suitable where the code must be
/// unpredictable.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000u32))
}
