fn main() -> anyhow::Result<()> {
    ks_cli::run()
}
