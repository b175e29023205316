//! HTML rendering: the batch report with D3.js charts and the single-result
//! authenticity certificate

use crate::analyzer::{AuthenticityLabel, CheckStatus, FileAnalysis, Modality, ModalityResult};
use crate::report::Summary;
use serde::Serialize;
use std::io::{self, Write};

const FOOTER_ENGINE: &str =
    "Generated by VeriSight Rule-Based Engine. Analyzed without Neural Networks.";
const FOOTER_CERTIFIES: &str =
    "This document certifies that the media has undergone strict mathematical forensics.";

/// Everything the certificate page shows. `id` is absent for results that
/// were never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateRecord {
    pub id: Option<i32>,
    pub file_name: String,
    pub modality: Option<Modality>,
    pub analyzed_at: String,
    pub result: ModalityResult,
}

impl CertificateRecord {
    pub fn from_analysis(analysis: &FileAnalysis) -> Self {
        Self {
            id: None,
            file_name: analysis.file_name.clone(),
            modality: analysis.modality,
            analyzed_at: chrono::Local::now().to_rfc3339(),
            result: analysis.result.clone(),
        }
    }

    /// `VS-<yyyymmdd>-<id>`, dated by the analysis when it parses
    pub fn report_id(&self) -> String {
        let date = chrono::DateTime::parse_from_rfc3339(&self.analyzed_at)
            .map(|d| d.format("%Y%m%d").to_string())
            .unwrap_or_else(|_| chrono::Local::now().format("%Y%m%d").to_string());
        let id = self
            .id
            .map(|i| i.to_string())
            .unwrap_or_else(|| "000".to_string());
        format!("VS-{}-{}", date, id)
    }
}

/// Bullet list under "What we analyzed"
pub fn methodology(modality: Option<Modality>) -> &'static [&'static str] {
    match modality {
        Some(Modality::Image) => &[
            "Metadata: Camera tags vs AI signatures",
            "Compression: Artifact variance patterns (ELA)",
            "Sensor Noise: Real camera characteristics",
            "Color Channels: Natural light interaction",
            "Texture: Hair, face, clothing details",
        ],
        Some(Modality::Audio) => &[
            "Spectral Analysis: Synthetic silence detection",
            "Frequency Cutoff: Upsampling artifacts",
            "Speech Patterns: Natural breathing gaps",
            "Noise Floor: Environmental consistency",
        ],
        Some(Modality::Text) => &[
            "Sentence Structure: Length variance",
            "Information Density: Character distribution",
            "Punctuation: Natural vs algorithmic usage",
            "Writing Style: Human characteristics",
        ],
        None => &[
            "Multiple forensic markers analyzed",
            "Mathematical authenticity verification",
        ],
    }
}

fn label_class(label: AuthenticityLabel) -> &'static str {
    match label {
        AuthenticityLabel::LikelyOrganic => "organic",
        AuthenticityLabel::LikelySynthetic => "synthetic",
        AuthenticityLabel::Inconclusive | AuthenticityLabel::Error => "amber",
    }
}

pub(crate) fn html_escape(s: &str) -> String {
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

// ============================================================================
// Certificate
// ============================================================================

pub fn write_certificate<W: Write>(writer: &mut W, record: &CertificateRecord) -> io::Result<()> {
    let result = &record.result;
    let modality = record
        .modality
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let methodology_html: String = methodology(record.modality)
        .iter()
        .map(|line| format!("            <li>&#10003; {}</li>\n", html_escape(line)))
        .collect();

    let regions_html = match result.details.region_report() {
        Some(r) => {
            let sections = [
                ("Hair Detail", &r.hair_detail),
                ("Face and Expression", &r.face_expression),
                ("Clothing Texture", &r.clothing_texture),
                ("Background and Environment", &r.background_env),
            ];
            let items: String = sections
                .iter()
                .map(|(title, text)| {
                    format!(
                        "            <div class=\"region\"><h3>{}</h3><p>{}</p></div>\n",
                        title,
                        html_escape(text)
                    )
                })
                .collect();
            format!(
                "        <section class=\"regions\">\n            <h2>Detailed Analysis Report</h2>\n{}        </section>\n",
                items
            )
        }
        None => String::new(),
    };

    let checks_html = if result.checks.is_empty() {
        "            <p class=\"dim\">No detailed check telemetry available.</p>\n".to_string()
    } else {
        result
            .checks
            .iter()
            .map(|c| {
                let badge = match c.status {
                    CheckStatus::Pass => "pass",
                    CheckStatus::Fail => "fail",
                };
                format!(
                    "            <div class=\"check\">\n                <div class=\"check-head\"><span class=\"check-name\">{}</span><span class=\"badge {}\">[{}]</span></div>\n                <div class=\"check-desc\">{}</div>\n                <div class=\"check-details\">{}</div>\n            </div>\n",
                    html_escape(&c.name),
                    badge,
                    c.status,
                    html_escape(&c.description),
                    html_escape(&c.details)
                )
            })
            .collect()
    };

    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Certificate {report_id} - {file_name}</title>
    <style>
        :root {{
            --bg: #f7f7fc;
            --ink: #1a1a4d;
            --dim: #666;
            --organic: #1a991a;
            --synthetic: #cc1a1a;
            --amber: #cc9900;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{ font-family: Helvetica, Arial, sans-serif; background: var(--bg); color: #222; }}
        .page {{ max-width: 820px; margin: 2rem auto; border: 1.5px solid var(--ink); background: #fff; }}
        header {{ background: #0d0d33; color: #fff; padding: 1.5rem 2rem; }}
        header h1 {{ font-size: 1.75rem; letter-spacing: 0.05em; }}
        header .tagline {{ color: #ccccff; font-size: 0.85rem; }}
        .ref {{ display: flex; justify-content: space-between; padding: 1rem 2rem; font-size: 0.8rem; border-bottom: 1px solid #ccd; color: var(--ink); }}
        section {{ padding: 1rem 2rem; }}
        h2 {{ font-size: 1rem; color: var(--ink); text-transform: uppercase; border-bottom: 1px solid var(--ink); display: inline-block; margin-bottom: 0.75rem; }}
        .verdict {{ border: 0.5px solid var(--ink); padding: 1rem 1.25rem; }}
        .classification {{ font-size: 1.5rem; font-weight: 700; text-transform: uppercase; }}
        .classification.organic {{ color: var(--organic); }}
        .classification.synthetic {{ color: var(--synthetic); }}
        .classification.amber {{ color: var(--amber); }}
        .trust {{ color: #4d4d4d; font-weight: 700; margin-top: 0.5rem; }}
        .reasoning {{ color: var(--dim); font-size: 0.85rem; margin-top: 0.5rem; }}
        ul.method {{ list-style: none; font-size: 0.8rem; color: #333; }}
        .region h3 {{ font-size: 0.9rem; margin-top: 0.5rem; }}
        .region p {{ font-size: 0.85rem; color: #4d4d4d; }}
        .check {{ margin-bottom: 0.75rem; }}
        .check-head {{ display: flex; gap: 1rem; font-weight: 700; }}
        .badge.pass {{ color: #008000; }}
        .badge.fail {{ color: #cc0000; }}
        .check-desc {{ font-style: italic; font-size: 0.75rem; color: var(--dim); padding-left: 1.25rem; }}
        .check-details {{ font-size: 0.8rem; color: #4d4d4d; padding-left: 1.25rem; }}
        .dim {{ color: var(--dim); }}
        footer {{ text-align: center; font-size: 0.7rem; color: #808080; padding: 1rem; }}
    </style>
</head>
<body>
    <div class="page">
        <header>
            <h1>VERISIGHT FORENSICS</h1>
            <div class="tagline">Deterministic Media Authenticity Report</div>
        </header>
        <div class="ref">
            <div><strong>REPORT ID:</strong> {report_id}</div>
            <div><strong>FILE:</strong> {file_name} ({modality})</div>
            <div><strong>ANALYSIS DATE:</strong> {analyzed_at}</div>
        </div>
        <section>
            <h2>Forensic Verdict</h2>
            <div class="verdict">
                <div><strong>CLASSIFICATION:</strong> <span class="classification {label_class}">{label}</span></div>
                <div class="trust">Integrated Trust Score: {score}/100</div>
                <div class="reasoning">{reasoning}</div>
            </div>
        </section>
        <section>
            <h2>What we analyzed</h2>
            <ul class="method">
{methodology}            </ul>
        </section>
{regions}        <section class="checks">
            <h2>Deterministic Checks Executed</h2>
{checks}        </section>
        <footer>
            <p>{footer_engine}</p>
            <p>{footer_certifies}</p>
        </footer>
    </div>
</body>
</html>
"#,
        report_id = record.report_id(),
        file_name = html_escape(&record.file_name),
        modality = modality,
        analyzed_at = html_escape(&record.analyzed_at),
        label_class = label_class(result.authenticity_label),
        label = result.authenticity_label,
        score = result.authenticity_score,
        reasoning = html_escape(&result.reasoning),
        methodology = methodology_html,
        regions = regions_html,
        checks = checks_html,
        footer_engine = FOOTER_ENGINE,
        footer_certifies = FOOTER_CERTIFIES,
    )?;

    Ok(())
}

// ============================================================================
// Batch report
// ============================================================================

#[derive(Serialize)]
struct ReportFile<'a> {
    filename: &'a str,
    filepath: &'a str,
    modality: Option<Modality>,
    label: AuthenticityLabel,
    score: u32,
    reasoning: &'a str,
    failed: Vec<&'a str>,
}

#[derive(Serialize)]
struct ReportData<'a> {
    summary: &'a Summary,
    files: Vec<ReportFile<'a>>,
}

/// Report payload embedded in the page as a JS literal
fn build_json_data(results: &[&FileAnalysis], summary: &Summary) -> io::Result<String> {
    let files = results
        .iter()
        .map(|r| ReportFile {
            filename: &r.file_name,
            filepath: &r.file_path,
            modality: r.modality,
            label: r.result.authenticity_label,
            score: r.result.authenticity_score,
            reasoning: &r.result.reasoning,
            failed: r.result.failed_checks().map(|c| c.name.as_str()).collect(),
        })
        .collect();
    let json = serde_json::to_string(&ReportData { summary, files })?;
    // Keep a stray "</script>" inside a file name from closing the block
    Ok(json.replace("</", "<\\/"))
}

pub fn write<W: Write>(writer: &mut W, results: &[FileAnalysis]) -> io::Result<()> {
    let summary = Summary::from_results(results);

    // Most suspicious first
    let mut sorted_results: Vec<_> = results.iter().collect();
    sorted_results.sort_by_key(|r| r.result.authenticity_score);

    let json_data = build_json_data(&sorted_results, &summary)?;

    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Verisight Analysis Report</title>
    <script src="https://d3js.org/d3.v7.min.js"></script>
    <style>
        :root {{
            --bg: #0d1117;
            --card: #161b22;
            --border: #30363d;
            --text: #e6edf3;
            --dim: #7d8590;
            --organic: #3fb950;
            --inconclusive: #d29922;
            --synthetic: #f85149;
            --error: #6e7681;
            --accent: #58a6ff;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.5;
        }}
        .container {{ max-width: 1400px; margin: 0 auto; padding: 2rem; }}
        .header {{
            display: flex;
            align-items: center;
            gap: 1rem;
            margin-bottom: 2rem;
            padding-bottom: 1rem;
            border-bottom: 1px solid var(--border);
        }}
        .logo {{
            font-size: 2.5rem;
            font-weight: 800;
            background: linear-gradient(135deg, var(--accent), #a371f7);
            -webkit-background-clip: text;
            -webkit-text-fill-color: transparent;
        }}
        .subtitle {{ color: var(--dim); font-size: 1rem; }}
        .stats {{
            display: grid;
            grid-template-columns: repeat(5, 1fr);
            gap: 1rem;
            margin-bottom: 2rem;
        }}
        .stat {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.5rem;
            text-align: center;
        }}
        .stat-value {{ font-size: 3rem; font-weight: 700; line-height: 1; }}
        .stat-label {{ color: var(--dim); font-size: 0.875rem; text-transform: uppercase; letter-spacing: 0.05em; margin-top: 0.5rem; }}
        .stat.organic .stat-value {{ color: var(--organic); }}
        .stat.inconclusive .stat-value {{ color: var(--inconclusive); }}
        .stat.synthetic .stat-value {{ color: var(--synthetic); }}
        .stat.error .stat-value {{ color: var(--error); }}
        .chart-card {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.5rem;
            margin-bottom: 2rem;
        }}
        .chart-title {{ font-size: 1rem; font-weight: 600; margin-bottom: 1rem; color: var(--dim); }}
        #donut-chart {{ display: flex; justify-content: center; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th {{ text-align: left; color: var(--dim); font-weight: 600; font-size: 0.75rem; text-transform: uppercase; padding: 0.75rem; border-bottom: 1px solid var(--border); }}
        td {{ padding: 0.75rem; border-bottom: 1px solid var(--border); font-size: 0.875rem; vertical-align: top; }}
        .label {{ display: inline-block; padding: 0.25rem 0.75rem; border-radius: 999px; font-size: 0.75rem; font-weight: 600; white-space: nowrap; }}
        .label.organic {{ background: rgba(63,185,80,0.15); color: var(--organic); }}
        .label.inconclusive {{ background: rgba(210,153,34,0.15); color: var(--inconclusive); }}
        .label.synthetic {{ background: rgba(248,81,73,0.15); color: var(--synthetic); }}
        .label.error {{ background: rgba(110,118,129,0.15); color: var(--error); }}
        .flag {{ display: inline-block; background: #21262d; border-radius: 6px; padding: 0.1rem 0.5rem; margin: 0.1rem; font-size: 0.75rem; }}
        .dim {{ color: var(--dim); }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <div class="logo">Verisight</div>
            <div class="subtitle">Deterministic media authenticity report</div>
        </div>

        <div class="stats">
            <div class="stat"><div class="stat-value">{total}</div><div class="stat-label">Files</div></div>
            <div class="stat organic"><div class="stat-value">{organic}</div><div class="stat-label">Likely Organic</div></div>
            <div class="stat inconclusive"><div class="stat-value">{inconclusive}</div><div class="stat-label">Inconclusive</div></div>
            <div class="stat synthetic"><div class="stat-value">{synthetic}</div><div class="stat-label">Likely Synthetic</div></div>
            <div class="stat error"><div class="stat-value">{error}</div><div class="stat-label">Errors</div></div>
        </div>

        <div class="chart-card">
            <div class="chart-title">Verdict Distribution</div>
            <div id="donut-chart"></div>
        </div>

        <div class="chart-card">
            <table>
                <thead>
                    <tr><th>Verdict</th><th>Trust</th><th>Type</th><th>Failed Checks</th><th>File</th></tr>
                </thead>
                <tbody id="results-table"></tbody>
            </table>
        </div>
    </div>

    <script>
    const data = {json_data};

    const colors = {{
        'Likely Organic': '#3fb950',
        'Inconclusive': '#d29922',
        'Likely Synthetic': '#f85149',
        'Error': '#6e7681'
    }};

    function labelClass(label) {{
        return label.toLowerCase().replace('likely ', '');
    }}

    function escapeHtml(s) {{
        const div = document.createElement('div');
        div.textContent = s;
        return div.innerHTML;
    }}

    function drawDonutChart() {{
        const counts = [
            {{ label: 'Likely Organic', value: data.summary.organic }},
            {{ label: 'Inconclusive', value: data.summary.inconclusive }},
            {{ label: 'Likely Synthetic', value: data.summary.synthetic }},
            {{ label: 'Error', value: data.summary.error }}
        ].filter(d => d.value > 0);

        const size = 240;
        const radius = size / 2;
        const svg = d3.select('#donut-chart')
            .append('svg')
            .attr('width', size)
            .attr('height', size)
            .append('g')
            .attr('transform', `translate(${{radius}},${{radius}})`);

        const pie = d3.pie().value(d => d.value).sort(null);
        const arc = d3.arc().innerRadius(radius * 0.6).outerRadius(radius - 4);

        svg.selectAll('path')
            .data(pie(counts))
            .enter()
            .append('path')
            .attr('d', arc)
            .attr('fill', d => colors[d.data.label])
            .attr('stroke', '#0d1117')
            .attr('stroke-width', 2);

        svg.append('text')
            .attr('text-anchor', 'middle')
            .attr('dy', '0.35em')
            .style('fill', '#e6edf3')
            .style('font-size', '2rem')
            .style('font-weight', 700)
            .text(data.summary.total);
    }}

    function buildTable() {{
        const tbody = document.getElementById('results-table');
        data.files.forEach(file => {{
            const failedHtml = file.failed.length > 0
                ? file.failed.map(f => `<span class="flag">${{escapeHtml(f)}}</span>`).join('')
                : '<span class="dim">-</span>';
            const tr = document.createElement('tr');
            tr.innerHTML = `
                <td><span class="label ${{labelClass(file.label)}}">${{file.label}}</span></td>
                <td>${{file.score}}/100</td>
                <td class="dim">${{file.modality || 'unknown'}}</td>
                <td>${{failedHtml}}</td>
                <td title="${{escapeHtml(file.reasoning)}}">${{escapeHtml(file.filename)}}</td>
            `;
            tbody.appendChild(tr);
        }});
    }}

    drawDonutChart();
    buildTable();
    </script>
</body>
</html>
"#,
        total = summary.total,
        organic = summary.organic,
        inconclusive = summary.inconclusive,
        synthetic = summary.synthetic,
        error = summary.error,
        json_data = json_data
    )?;

    Ok(())
}
