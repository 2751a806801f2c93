use crate::error::{ModelFinderError, UserFriendlyError};
use crate::relocate::{ModelStatus, RelocationPlan, RelocationReport};
use crate::results::{CleanupReport, ResolvedPath};
use crate::ui::progress::format_duration;
use console::{style, Emoji, Term};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");
static FOLDER: Emoji = Emoji("📁 ", "");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let term = Term::stdout();
        let use_colors = match mode {
            OutputMode::Human => term.features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => eprintln!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => {}
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &ModelFinderError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Prints a resolved directory or file path. Shown even in quiet mode,
    /// since the path is the command's result; plain mode prints only the path.
    pub fn print_path(&self, label: &str, resolved: &ResolvedPath) {
        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!(
                        "{}{}: {}",
                        FOLDER,
                        style(label).bold(),
                        style(resolved.path().display()).cyan()
                    );
                } else {
                    println!("{}: {}", label, resolved.path().display());
                }

                if let Some(ref reason) = resolved.fallback_reason {
                    self.warning(&format!(
                        "Using {} location because {}",
                        resolved.origin.label(),
                        reason
                    ));
                } else {
                    self.info(&format!("Location: {}", resolved.origin.label()));
                }
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "path",
                    "label": label,
                    "path": resolved.path(),
                    "origin": resolved.origin,
                    "fallback": resolved.is_fallback(),
                    "fallback_reason": resolved.fallback_reason,
                }));
            }
            OutputMode::Plain => println!("{}", resolved.path().display()),
        }
    }

    pub fn print_cleanup_candidates(&self, base: &Path, retention_days: u32, candidates: &[PathBuf]) {
        match self.mode {
            OutputMode::Human => {
                if candidates.is_empty() {
                    self.success(&format!(
                        "No result folders older than {} days in {}",
                        retention_days,
                        base.display()
                    ));
                    return;
                }

                self.print_header("Cleanup Preview");
                println!(
                    "Would remove {} folder(s) older than {} days:",
                    candidates.len(),
                    retention_days
                );
                for candidate in candidates {
                    println!("  - {}", candidate.display());
                }
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "cleanup_preview",
                    "base": base,
                    "retention_days": retention_days,
                    "candidates": candidates,
                }));
            }
            OutputMode::Plain => {
                for candidate in candidates {
                    println!("{}", candidate.display());
                }
            }
        }
    }

    pub fn print_cleanup_report(&self, report: &CleanupReport) {
        match self.mode {
            OutputMode::Human => {
                if report.base_missing {
                    self.warning(&format!(
                        "Results directory does not exist: {}",
                        report.base.display()
                    ));
                    return;
                }

                self.success(&format!(
                    "Removed {} result folder(s) older than {} days",
                    report.removed_count(),
                    report.retention_days
                ));
                if self.should_show_message(1) {
                    for removed in &report.removed {
                        println!("  - {}", removed.display());
                    }
                }
                for failure in &report.failures {
                    self.error(&format!("Could not remove {}: {}", failure.path.display(), failure.error));
                }
            }
            OutputMode::Json => {
                let mut value = serde_json::to_value(report).unwrap_or_default();
                if let Some(object) = value.as_object_mut() {
                    object.insert("type".to_string(), "cleanup".into());
                    object.insert("removed_count".to_string(), report.removed_count().into());
                }
                self.print_json_object(&value);
            }
            OutputMode::Plain => {
                println!("Removed: {}", report.removed_count());
                for failure in &report.failures {
                    eprintln!("FAILED: {}: {}", failure.path.display(), failure.error);
                }
            }
        }
    }

    pub fn print_relocation_plan(&self, plan: &RelocationPlan) {
        match self.mode {
            OutputMode::Human => {
                self.print_header("Relocation Plan");
                for model in &plan.present {
                    println!(
                        "  {} {} -> {} ({} files, {})",
                        style("copy").green(),
                        model.source.display(),
                        model.target.display(),
                        model.total_files,
                        format_bytes(model.total_bytes)
                    );
                }
                for model in &plan.missing {
                    println!(
                        "  {} {} (folder '{}' not found)",
                        style("skip").yellow(),
                        model.name,
                        model.download_folder
                    );
                }
                println!();
                println!(
                    "Total: {} files, {}",
                    plan.total_files(),
                    format_bytes(plan.total_bytes())
                );
            }
            OutputMode::Json => {
                let mut value = serde_json::to_value(plan).unwrap_or_default();
                if let Some(object) = value.as_object_mut() {
                    object.insert("type".to_string(), "relocation_plan".into());
                }
                self.print_json_object(&value);
            }
            OutputMode::Plain => {
                for model in &plan.present {
                    println!("COPY {} {}", model.source.display(), model.target.display());
                }
                for model in &plan.missing {
                    println!("SKIP {}", model.download_folder);
                }
            }
        }
    }

    pub fn print_relocation_report(&self, report: &RelocationReport) {
        match self.mode {
            OutputMode::Human => self.print_human_relocation_report(report),
            OutputMode::Json => {
                let mut value = serde_json::to_value(report).unwrap_or_default();
                if let Some(object) = value.as_object_mut() {
                    object.insert("type".to_string(), "relocation".into());
                }
                self.print_json_object(&value);
            }
            OutputMode::Plain => {
                println!("COMPLETED: Relocation");
                println!("Models copied: {}", report.copied_count());
                println!("Files copied: {}", report.files_copied);
                println!("Bytes copied: {}", report.bytes_copied);
                println!("Duration: {:?}", report.duration);
                if report.has_errors() {
                    println!("Errors: {}", report.errors.len());
                }
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error | MessageType::Warning => {
                    eprintln!("{}{}", emoji, color_fn(message))
                }
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error | MessageType::Warning => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_relocation_report(&self, report: &RelocationReport) {
        println!();
        self.print_separator();

        let headline = if report.has_errors() {
            "Relocation finished with errors"
        } else {
            "Relocation completed!"
        };
        if self.use_colors {
            let styled = if report.has_errors() {
                style(headline).yellow().bold()
            } else {
                style(headline).green().bold()
            };
            println!("{} {}", styled, CHECKMARK);
        } else {
            println!("✓ {}", headline);
        }

        println!();
        for model in &report.models {
            let status = match model.status {
                ModelStatus::Copied => style("copied").green(),
                ModelStatus::Partial => style("partial").yellow(),
                ModelStatus::Missing => style("missing").dim(),
                ModelStatus::Failed => style("failed").red(),
            };
            println!("  {:<8} {} -> {}", status, model.name, model.target.display());
        }
        println!();
        println!("  Files copied:    {}", self.highlight(report.files_copied.to_string()));
        println!("  Bytes copied:    {}", self.highlight(format_bytes(report.bytes_copied)));
        println!("  Time taken:      {}", self.highlight(format_duration(report.duration)));

        if report.has_errors() {
            println!("  Errors:          {}", report.errors.len());
            for error in &report.errors {
                println!("    - {}", error);
            }
        }

        self.print_separator();
    }

    fn highlight(&self, value: String) -> String {
        if self.use_colors {
            style(value).cyan().bold().to_string()
        } else {
            value
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_parsing() {
        assert_eq!(OutputMode::from_string("human"), OutputMode::Human);
        assert_eq!(OutputMode::from_string("JSON"), OutputMode::Json);
        assert_eq!(OutputMode::from_string("plain"), OutputMode::Plain);
        assert_eq!(OutputMode::from_string("invalid"), OutputMode::Human);
    }

    #[test]
    fn test_formatter_creation() {
        let formatter = OutputFormatter::new(OutputMode::Plain, 1, false);
        assert_eq!(formatter.mode(), OutputMode::Plain);
        assert_eq!(formatter.verbose_level, 1);
        assert!(!formatter.use_colors);
    }

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(!formatter.should_show_message(0));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(52_428_800), "50.0 MB");
        assert_eq!(format_bytes(1_099_511_627_776), "1.0 TB");
    }

    #[test]
    fn test_should_show_message() {
        let formatter = OutputFormatter::new(OutputMode::Human, 1, false);
        assert!(formatter.should_show_message(0));
        assert!(formatter.should_show_message(1));
        assert!(!formatter.should_show_message(2));
    }
}
