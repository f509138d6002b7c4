use anyhow::Result;

fn main() -> Result<()> {
    pycheck::cli::run()
}
