fn main() -> anyhow::Result<()> {
    watchsense_lib::run()
}
