use std::io::Write;

use owo_colors::OwoColorize;
use papertools_core::{BatchEvent, BatchReport, FileStatus};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Which driver produced the events, for wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Rename,
    Bib,
}

/// Print a real-time batch event.
pub fn print_event(
    w: &mut dyn Write,
    event: &BatchEvent<'_>,
    mode: Mode,
    dry_run: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        BatchEvent::Started { total } => {
            let what = match mode {
                Mode::Rename => "to rename",
                Mode::Bib => "to generate .bib files for",
            };
            if dry_run {
                writeln!(w, "Found {} PDF(s) {} (dry run)", total, what)?;
            } else {
                writeln!(w, "Found {} PDF(s) {}", total, what)?;
            }
        }
        BatchEvent::Processing { .. } => {}
        BatchEvent::Outcome {
            index,
            total,
            outcome,
        } => {
            let idx = index + 1;
            let name = &outcome.file_name;
            match &outcome.status {
                FileStatus::Renamed { new_name, source } => {
                    let verb = if dry_run { "Would rename" } else { "Renamed" };
                    if color.enabled() {
                        writeln!(
                            w,
                            "[{}/{}] {}: {} -> {} {}",
                            idx,
                            total,
                            verb.green(),
                            name,
                            new_name.bold(),
                            format!("({})", source.as_str()).dimmed()
                        )?;
                    } else {
                        writeln!(
                            w,
                            "[{}/{}] {}: {} -> {} ({})",
                            idx,
                            total,
                            verb,
                            name,
                            new_name,
                            source.as_str()
                        )?;
                    }
                }
                FileStatus::BibWritten { bib_name, key } => {
                    let verb = if dry_run { "Would create" } else { "Created" };
                    if color.enabled() {
                        writeln!(
                            w,
                            "[{}/{}] {} .bib file for '{}' as '{}' {}",
                            idx,
                            total,
                            verb.green(),
                            name,
                            bib_name,
                            format!("[{}]", key).dimmed()
                        )?;
                    } else {
                        writeln!(
                            w,
                            "[{}/{}] {} .bib file for '{}' as '{}' [{}]",
                            idx, total, verb, name, bib_name, key
                        )?;
                    }
                }
                FileStatus::Skipped { reason } => {
                    if color.enabled() {
                        writeln!(
                            w,
                            "[{}/{}] {} '{}': {}",
                            idx,
                            total,
                            "Skipping".yellow(),
                            name,
                            reason
                        )?;
                    } else {
                        writeln!(w, "[{}/{}] Skipping '{}': {}", idx, total, name, reason)?;
                    }
                }
                FileStatus::Failed(err) => {
                    if color.enabled() {
                        writeln!(
                            w,
                            "[{}/{}] {}: {}: {}",
                            idx,
                            total,
                            "Failed".red(),
                            name,
                            err
                        )?;
                    } else {
                        writeln!(w, "[{}/{}] Failed: {}: {}", idx, total, name, err)?;
                    }
                }
            }
        }
        BatchEvent::Collision(c) => {
            let msg = format!(
                "duplicate bib key '{}' ('{}' and '{}')",
                c.key, c.first, c.second
            );
            if color.enabled() {
                writeln!(w, "{} {}", "WARNING:".yellow(), msg)?;
            } else {
                writeln!(w, "WARNING: {}", msg)?;
            }
        }
    }
    Ok(())
}

/// Print the final summary line.
pub fn print_summary(
    w: &mut dyn Write,
    report: &BatchReport,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let done = format!("{} succeeded", report.succeeded());
    let skipped = format!("{} skipped", report.skipped());
    let failed = format!("{} failed", report.failed());

    if color.enabled() {
        writeln!(
            w,
            "{} {}, {}, {}",
            "Done:".bold(),
            done.green(),
            skipped.yellow(),
            if report.failed() > 0 {
                failed.red().to_string()
            } else {
                failed
            }
        )?;
    } else {
        writeln!(w, "Done: {}, {}, {}", done, skipped, failed)?;
    }

    if !report.collisions.is_empty() {
        writeln!(
            w,
            "{} duplicate bib key(s); rename one of each pair before citing both",
            report.collisions.len()
        )?;
    }
    if report.dry_run {
        writeln!(w, "Dry run: no files were changed.")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertools_core::{FileFailure, FileOutcome, KeyCollision, MetadataSource};

    fn render(event: &BatchEvent<'_>, mode: Mode, dry_run: bool) -> String {
        let mut buf = Vec::new();
        print_event(&mut buf, event, mode, dry_run, ColorMode(false)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn renamed_line_names_source() {
        let outcome = FileOutcome {
            file_name: "scan.pdf".into(),
            status: FileStatus::Renamed {
                new_name: "[] - Smith - Deep Learning (2020).pdf".into(),
                source: MetadataSource::Embedded,
            },
        };
        let line = render(
            &BatchEvent::Outcome {
                index: 0,
                total: 2,
                outcome: &outcome,
            },
            Mode::Rename,
            false,
        );
        assert_eq!(
            line,
            "[1/2] Renamed: scan.pdf -> [] - Smith - Deep Learning (2020).pdf (embedded)\n"
        );
    }

    #[test]
    fn dry_run_changes_verb() {
        let outcome = FileOutcome {
            file_name: "[] - Smith - Deep (2020).pdf".into(),
            status: FileStatus::BibWritten {
                bib_name: "[] - Smith - Deep (2020).bib".into(),
                key: "smith2020deep".into(),
            },
        };
        let line = render(
            &BatchEvent::Outcome {
                index: 0,
                total: 1,
                outcome: &outcome,
            },
            Mode::Bib,
            true,
        );
        assert!(line.starts_with("[1/1] Would create .bib file for"));
        assert!(line.contains("[smith2020deep]"));
    }

    #[test]
    fn failure_and_collision_lines() {
        let outcome = FileOutcome {
            file_name: "a.pdf".into(),
            status: FileStatus::Failed(FileFailure::TargetExists {
                path: "b.pdf".into(),
            }),
        };
        let line = render(
            &BatchEvent::Outcome {
                index: 2,
                total: 3,
                outcome: &outcome,
            },
            Mode::Rename,
            false,
        );
        assert_eq!(line, "[3/3] Failed: a.pdf: target already exists: b.pdf\n");

        let collision = KeyCollision {
            key: "smith2020deep".into(),
            first: "x.pdf".into(),
            second: "y.pdf".into(),
        };
        let line = render(&BatchEvent::Collision(&collision), Mode::Bib, false);
        assert!(line.starts_with("WARNING: duplicate bib key 'smith2020deep'"));
    }

    #[test]
    fn summary_counts_and_dry_run_note() {
        let report = BatchReport {
            dry_run: true,
            outcomes: vec![FileOutcome {
                file_name: "n.pdf".into(),
                status: FileStatus::Skipped {
                    reason: "unrecognized filename format".into(),
                },
            }],
            collisions: Vec::new(),
        };
        let mut buf = Vec::new();
        print_summary(&mut buf, &report, ColorMode(false)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Done: 0 succeeded, 1 skipped, 0 failed"));
        assert!(text.contains("Dry run: no files were changed."));
    }
}
