//! Interface de terminal do humanizer: barra de progresso e saída colorida.
//!
//! Usa as crates `indicatif` para a barra de progresso e `console` para
//! estilização com cores. O [`JobProgress`] acompanha visualmente
//! a execução de um job no terminal.

use chrono::NaiveDate;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::ClassifiedError;
use crate::ledger::UsageLedger;
use crate::workflow::Completion;

/// Indicador visual de progresso para a execução de um job no terminal.
///
/// Exibe uma barra de 0 a 100 durante o processamento e mensagens
/// coloridas para sucesso (verde), falha (vermelho) e avisos (amarelo).
pub struct JobProgress {
    // Barra de progresso do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para dicas e avisos.
    yellow: Style,
}

impl JobProgress {
    /// Inicia a barra com a mensagem de processamento e retorna a instância de progresso.
    pub fn start() -> Self {
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} Processing your text... [{bar:30.cyan/blue}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        pb.set_style(style);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza a barra com o percentual estimado.
    pub fn update(&self, percent: f64) {
        self.pb.set_position(percent.round().clamp(0.0, 100.0) as u64);
    }

    /// Finaliza a barra e exibe o texto humanizado e os créditos cobrados.
    pub fn complete(&self, completion: &Completion) {
        self.pb.finish_and_clear();
        println!(
            "  {} Text humanized ({} credits, {} characters)",
            self.green.apply_to("✓"),
            completion.result.cost_credits,
            completion.result.output.chars().count()
        );
        println!();
        println!("{}", completion.result.output);
    }

    /// Finaliza a barra e exibe a mensagem de erro ao usuário.
    ///
    /// Falhas com `retryable` recebem uma sugestão de tentar novamente.
    pub fn fail(&self, err: &ClassifiedError) {
        self.pb.finish_and_clear();
        eprintln!("  {} {}", self.red.apply_to("✗"), err.message);
        if err.retryable {
            eprintln!("  {}", self.yellow.apply_to("You can try again."));
        }
    }

    /// Imprime o saldo de créditos do plano após aplicar o débito.
    pub fn print_ledger(&self, plan_name: &str, ledger: &UsageLedger) {
        println!();
        println!("{}", self.yellow.apply_to(ledger_summary(plan_name, ledger)));
    }
}

/// Linha de saldo, por exemplo `Pro plan, credits: 3750/5000`.
pub fn ledger_summary(plan_name: &str, ledger: &UsageLedger) -> String {
    format!(
        "{plan_name} plan, credits: {}/{}",
        ledger.remaining(),
        ledger.total_credits
    )
}

/// Nome de arquivo padrão para exportar o texto humanizado.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("humanized-text-{}.txt", date.format("%Y-%m-%d"))
}
