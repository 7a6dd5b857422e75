//! Build metadata generated by `build.rs`

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Heartbeat protocol version, from `[package.metadata] ft_protocol_version`
pub fn ft_protocol_version() -> u32 {
    FT_PROTOCOL_VERSION
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// One-line version banner for `--version` style output
pub fn banner() -> String {
    format!(
        "{} {} (protocol {}, {} built {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        ft_protocol_version(),
        git_hash(),
        build_time()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version_comes_from_package_metadata() {
        assert_eq!(ft_protocol_version(), 1);
        assert!(banner().contains("(protocol 1,"), "got: {}", banner());
    }
}
