fn main() -> anyhow::Result<()> {
    remarkdesk::cli::run()
}
