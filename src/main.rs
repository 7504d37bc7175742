use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use multikf::cli::{
    self, format_machine_json, format_machine_list, format_version, Cli, Commands, ConnectTarget,
    GetResource, OutputFormat,
};
use multikf::machine::{factory_for, UpOutcome};
use multikf::process::TokioProcessRunner;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Version = cli.command {
        print!("{}", format_version());
        return Ok(());
    }

    let config = cli::runtime_config(&cli)?;
    info!(
        "Using {} provisioner with state in {}",
        config.provisioner,
        config.root_dir.display()
    );
    let factory = factory_for(
        config.provisioner,
        &config.root_dir,
        config.verbose,
        Arc::new(TokioProcessRunner),
    );

    match &cli.command {
        Commands::Add(args) => match cli::add(factory.as_ref(), args, config.verbose).await? {
            UpOutcome::Created => println!("machine {} is up", args.name),
            UpOutcome::AlreadyRunning => {
                println!("machine {} is already running (use --force to recreate)", args.name)
            }
        },
        Commands::Delete(args) => {
            cli::delete(factory.as_ref(), &args.name, args.force).await?;
            println!("machine {} deleted", args.name);
        }
        Commands::List(args) => {
            let machines = cli::list(factory.as_ref()).await?;
            match args.output {
                OutputFormat::Table => print!("{}", format_machine_list(&machines)),
                OutputFormat::Json => println!("{}", format_machine_json(&machines)?),
            }
        }
        Commands::Export(args) => {
            let path = cli::export(
                factory.as_ref(),
                &args.name,
                args.kubeconfig_path.clone(),
                args.force,
            )
            .await?;
            println!("kubeconfig written to {}", path.display());
        }
        Commands::Connect(args) => match &args.target {
            ConnectTarget::Kubeflow { name, port } => {
                let local_port = cli::kubeflow_local_port(*port)?;
                println!("Kubeflow dashboard: http://localhost:{}", local_port);
                cli::connect_kubeflow(factory.as_ref(), name, local_port).await?;
            }
        },
        Commands::Get(args) => match &args.resource {
            GetResource::Pods { name, namespace } => {
                print!("{}", cli::get_pods(factory.as_ref(), name, namespace).await?);
            }
        },
        Commands::Version => {}
    }

    Ok(())
}
