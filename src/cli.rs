//! Interface de linha de comando do humanizer baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (humanize, estimate)
//! e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::api::{Purpose, Readability, Strength};

/// humanizer: reescreve texto pelo serviço de humanização e acompanha o job.
#[derive(Debug, Parser)]
#[command(name = "humanizer", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./humanizer.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Aumenta o nível de log (-v info, -vv debug, -vvv trace).
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Origem do texto: argumento posicional ou arquivo.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Texto a humanizar.
    #[arg(conflicts_with = "file")]
    pub text: Option<String>,

    /// Lê o texto de um arquivo.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Ignora o plano configurado e usa os limites anônimos.
    #[arg(long, default_value_t = false)]
    pub anonymous: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Envia o texto ao serviço e aguarda o resultado.
    Humanize {
        #[command(flatten)]
        input: InputArgs,

        /// Nível de leitura do texto reescrito.
        #[arg(long, value_enum, default_value_t = Readability::default())]
        readability: Readability,

        /// Finalidade do texto.
        #[arg(long, value_enum, default_value_t = Purpose::default())]
        purpose: Purpose,

        /// Intensidade da reescrita.
        #[arg(long, value_enum, default_value_t = Strength::default())]
        strength: Strength,

        /// Grava o texto humanizado neste caminho.
        #[arg(long, conflicts_with = "save")]
        output: Option<PathBuf>,

        /// Grava o texto humanizado em humanized-text-AAAA-MM-DD.txt.
        #[arg(long, default_value_t = false)]
        save: bool,
    },

    /// Mostra o custo em créditos e valida o texto sem enviá-lo.
    Estimate {
        #[command(flatten)]
        input: InputArgs,
    },
}
