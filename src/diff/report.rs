use super::{Change, ChangeSet};
use colored::{Color, Colorize};
use std::io::{self, Write};

/// Renders a [`ChangeSet`] as the line-oriented `diff` output.
///
/// ```text
/// + new/file
/// ~ modified/file
///   size:1 mtime:... uid:0 gid:0 mode:-rw-r--r-- checksum:...
///   size:2 mtime:... uid:0 gid:0 mode:-rw-r--r-- checksum:...
/// > old/path => new/path
/// - deleted/file
///
/// 1 new, 2 modified, 1 deleted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reporter {
    /// Color the leading marker of each line
    pub color: bool,
    /// Print only the summary line
    pub summary_only: bool,
    /// Print nothing at all
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self {
            color: true,
            summary_only: false,
            quiet: false,
        }
    }
}

impl Reporter {
    /// Writes the report for `changes` to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn render<W: Write>(&self, changes: &ChangeSet, out: &mut W) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        if !self.summary_only {
            for change in &changes.changes {
                self.render_change(change, out)?;
            }
            writeln!(out)?;
        }

        if !changes.summary.is_empty() {
            writeln!(out, "{}", changes.summary)?;
        }

        Ok(())
    }

    fn render_change<W: Write>(&self, change: &Change, out: &mut W) -> io::Result<()> {
        match change {
            Change::New { after } => {
                writeln!(out, "{} {}", self.marker("+", Color::Green), after.path)
            }
            Change::Modified {
                before,
                after,
                properties,
            } => {
                if before.path == after.path {
                    writeln!(out, "{} {}", self.marker("~", Color::Yellow), after.path)?;
                } else {
                    writeln!(
                        out,
                        "{} {} => {}",
                        self.marker(">", Color::Cyan),
                        before.path,
                        after.path
                    )?;
                }
                if !properties.is_empty() {
                    writeln!(out, "  {before}\n  {after}")?;
                }
                Ok(())
            }
            Change::Deleted { before } => {
                writeln!(out, "{} {}", self.marker("-", Color::Red), before.path)
            }
        }
    }

    fn marker(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    /// Renders into a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the rendered bytes are not valid UTF-8.
    pub fn render_to_string(&self, changes: &ChangeSet) -> io::Result<String> {
        let mut buf = Vec::new();
        self.render(changes, &mut buf)?;
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
