use rand::Rng as _;

/// Generate a proposal branch name: `{prefix}{unix millis}-{6 hex chars}`.
///
/// The random suffix keeps two proposals minted in the same millisecond
/// apart; callers still confirm the name is unused before creating it.
pub fn generate(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(0..0x0100_0000);
    format!("{}{}-{:06x}", prefix, millis, suffix)
}
