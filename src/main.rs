fn main() {
    #[cfg(feature = "cli")]
    tabcodec::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("tabcodec: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
