use backlog::FormatterRegistry;
use clap::Args;

#[derive(Args, Debug)]
#[command(about = "List the formatter ids usable in configuration files and --format.")]
pub struct Cmd {}

impl Cmd {
    pub fn run(&self) -> eyre::Result<()> {
        let registry = FormatterRegistry::with_builtins();

        for id in registry.ids() {
            println!("{}", id);
        }
        Ok(())
    }
}
