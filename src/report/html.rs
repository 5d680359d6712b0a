use std::fmt::Write;

use super::{DocumentError, DocumentRenderer, ReportContext, PLOT_UNAVAILABLE};
use crate::data::model::Evidence;
use crate::render::PlotKind;

const STYLE: &str = "\
        body { font-family: Arial, sans-serif; margin: 20px; }
        .container { max-width: 1200px; margin: 0 auto; }
        .header { text-align: center; margin-bottom: 30px; }
        .section { margin-bottom: 30px; }
        .plot { width: 100%; max-width: 800px; margin: 20px auto; }
        .placeholder { color: #888; font-style: italic; text-align: center; }
        table { width: 100%; border-collapse: collapse; margin: 20px 0; }
        th, td { padding: 8px; text-align: left; border: 1px solid #ddd; }
        th { background-color: #f2f2f2; }
";

/// Summary table rows: label and context field.
const SUMMARY_ROWS: [(&str, &str); 5] = [
    ("Technosignature Score", "techno_score"),
    ("Anomaly Score", "anomaly_score"),
    ("Transit Power", "transit_power"),
    ("IR Excess", "ir_excess"),
    ("HI Line Hit Count", "hi_hit_count"),
];

/// Standalone HTML page per candidate.  Plots are linked, not embedded.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlReportRenderer;

impl DocumentRenderer for HtmlReportRenderer {
    fn extension(&self) -> &'static str {
        "html"
    }

    fn render(&self, ctx: &ReportContext) -> Result<Vec<u8>, DocumentError> {
        let source_id = escape(ctx.field("source_id"));
        let mut out = String::with_capacity(4096);

        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"utf-8\">\n    \
             <title>Technosignature Candidate Report - {source_id}</title>\n    \
             <style>\n{STYLE}    </style>\n</head>\n<body>\n    <div class=\"container\">\n        \
             <div class=\"header\">\n            <h1>Technosignature Candidate Report</h1>\n            \
             <h2>Source ID: {source_id}</h2>\n            <p>Mission: {}</p>\n        </div>\n",
            escape(ctx.field("mission"))
        );

        out.push_str(
            "        <div class=\"section\">\n            <h3>Anomaly Summary</h3>\n            <table>\n                \
             <tr><th>Metric</th><th>Value</th></tr>\n",
        );
        for (label, field) in SUMMARY_ROWS {
            let _ = writeln!(
                out,
                "                <tr><td>{label}</td><td>{}</td></tr>",
                escape(ctx.field(field))
            );
        }
        out.push_str("            </table>\n        </div>\n");

        for kind in PlotKind::ALL {
            let _ = writeln!(
                out,
                "        <div class=\"section\">\n            <h3>{}</h3>",
                kind.title()
            );
            match ctx.plot(kind) {
                Evidence::Present(link) => {
                    let _ = writeln!(
                        out,
                        "            <img src=\"{}\" class=\"plot\" alt=\"{}\">",
                        escape(link),
                        kind.title()
                    );
                }
                Evidence::Absent => {
                    let _ = writeln!(
                        out,
                        "            <p class=\"placeholder\">{PLOT_UNAVAILABLE}</p>"
                    );
                }
            }
            out.push_str("        </div>\n");
        }

        out.push_str("    </div>\n</body>\n</html>\n");
        Ok(out.into_bytes())
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
