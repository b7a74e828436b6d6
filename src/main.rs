use clap::Parser;
use dentlab::cli::{Cli, Commands};
use dentlab::logging::{init_logging, Verbosity};
use miette::Result;

fn main() -> Result<()> {
    // Terminate quietly on broken pipe (`dlab ws list | head`)
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(Verbosity::from_flags(global.quiet, global.verbose));

    match cli.command {
        Commands::Init(args) => dentlab::cli::commands::init::run(args),
        Commands::Dentist(cmd) => dentlab::cli::commands::dentist::run(cmd, &global),
        Commands::Order(cmd) => dentlab::cli::commands::order::run(cmd, &global),
        Commands::Ws(cmd) => dentlab::cli::commands::ws::run(cmd, &global),
        Commands::Chart(args) => dentlab::cli::commands::chart::run(args, &global),
        Commands::Product(cmd) => dentlab::cli::commands::product::run(cmd, &global),
        Commands::Material(cmd) => dentlab::cli::commands::material::run(cmd, &global),
        Commands::Lot(cmd) => dentlab::cli::commands::lot::run(cmd, &global),
        Commands::Qc(cmd) => dentlab::cli::commands::qc::run(cmd, &global),
        Commands::Invoice(cmd) => dentlab::cli::commands::invoice::run(cmd, &global),
        Commands::Doc(cmd) => dentlab::cli::commands::doc::run(cmd, &global),
        Commands::Team(cmd) => cmd.run(&global),
        Commands::Report(cmd) => dentlab::cli::commands::report::run(cmd, &global),
        Commands::Export(args) => dentlab::cli::commands::export::run(args, &global),
        Commands::Completions(args) => dentlab::cli::commands::completions::run(args),
    }
}
