use crate::report::{format_ic50, format_pic50, to_csv_string, IC50_COLUMN, PIC50_COLUMN, SMILES_COLUMN};
use crate::{ModelId, ModelRegistry, PredictionReport};
use base64::{engine::general_purpose, Engine as _};
use std::fmt::Display;
use tracing::*;

const PUBCHEM_SKETCHER: &str = "https://pubchem.ncbi.nlm.nih.gov/edit2/index.html";
const CHEMBL: &str = "https://www.ebi.ac.uk/chembl/";

/// Offered for download next to the upload control to show the expected format.
pub const EXAMPLE_UPLOAD: &str = "\
CN1C=NC2=C1C(=O)N(C(=O)N2C)C
CC(=O)Oc1ccccc1C(=O)O
O=C(Nc1ccc(cc1)C(F)(F)F)c1cnoc1C
";

const GLOBAL_STYLES: &str = r#"
/* Global styles */
body {
		font-family: 'Helvetica Neue', Helvetica, Arial, sans-serif;
		background: #f5f7fa;
		color: #333;
		margin: 0;
		padding: 0;
		display: flex;
		min-height: 100vh;
}
.sidebar {
		width: 320px;
		background-color: #ADD8E6;
		padding: 24px;
		box-sizing: border-box;
}
.sidebar h2 {
		font-size: 1.2rem;
		margin-top: 1.5em;
}
.container {
		flex: 1;
		max-width: 900px;
		margin: 30px auto;
		background: #ffffff;
		padding: 40px;
		border-radius: 8px;
		box-shadow: 0 2px 10px rgba(0, 0, 0, 0.1);
}
h1.title {
		color: #0000FF;
		font-family: monospace;
}
h1.results {
		color: purple;
}
form {
		display: flex;
		flex-direction: column;
		gap: 12px;
}
input[type="text"], select {
		width: 100%;
		padding: 10px;
		font-size: 1rem;
		border: 1px solid #ccc;
		border-radius: 4px;
		box-sizing: border-box;
}
input[type="submit"] {
		padding: 12px;
		background-color: #007BFF;
		color: #fff;
		border: none;
		border-radius: 4px;
		font-size: 1.1rem;
		cursor: pointer;
		transition: background-color 0.3s ease;
}
input[type="submit"]:hover {
		background-color: #0056b3;
}
.or {
		text-align: center;
		margin: 0.5em;
}
img.logo {
		display: block;
		max-width: 100%;
		height: auto;
		margin: 20px auto;
}
table {
		border-collapse: collapse;
		width: 100%;
		margin: 20px 0;
}
th, td {
		border: 1px solid #ddd;
		padding: 8px;
		text-align: left;
		font-family: monospace;
}
th {
		background: #f0f0f0;
}
a {
		color: #007BFF;
		text-decoration: none;
		font-weight: bold;
}
a:hover {
		text-decoration: underline;
}
.alert {
		padding: 15px;
		background-color: #f44336;
		color: white;
		margin-bottom: 20px;
		border-radius: 4px;
}
.warning {
		padding: 15px;
		background-color: #ff9800;
		color: white;
		margin-bottom: 20px;
		border-radius: 4px;
}
"#;

/// Reads the chosen file into the hidden `upload` field so the form can be
/// posted as plain url-encoded data.
const UPLOAD_SCRIPT: &str = r#"
function readUpload(input) {
    var target = document.getElementById('upload');
    target.value = '';
    if (!input.files || input.files.length === 0) {
        return;
    }
    var reader = new FileReader();
    reader.onload = function(event) {
        target.value = event.target.result;
    };
    reader.readAsText(input.files[0]);
}
"#;

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(text: impl Display) -> String {
    text.to_string()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Everything the page needs besides the outcome of a prediction.
pub struct PageContext<'a> {
    pub registry: &'a ModelRegistry,
    pub selected_model: ModelId,
    pub smiles: &'a str,
    pub logo_png: Option<&'a [u8]>,
}

/// What to show below the introduction.
pub enum Outcome<'a> {
    Nothing,
    Report(&'a PredictionReport),
    Error(String),
}

fn model_options(context: &PageContext) -> String {
    let mut html = String::new();
    for (id, _) in context.registry.entries() {
        let selected = if id == context.selected_model { " selected" } else { "" };
        let missing = if context.registry.is_available(id) { "" } else { " (unavailable)" };
        html.push_str(&format!(
            r#"<option value="{id}"{selected}>{id} ({label}){missing}</option>"#,
            label = id.label(),
        ));
    }
    html
}

fn sidebar(context: &PageContext) -> String {
    format!(
        r#"
        <div class="sidebar">
            <form action="/predict" method="post">
                <h2>1. Draw a Chemical Structure</h2>
                <p>
                    <a href="{PUBCHEM_SKETCHER}" target="_blank">Draw a structure in the PubChem Sketcher</a>,
                    then copy the resulting SMILES string and paste it below, or directly input your
                    SMILES string if you have one.
                </p>
                <label for="smiles">Paste your SMILES string here</label>
                <input type="text" id="smiles" name="smiles" value="{smiles}">

                <p class="or">OR</p>

                <label for="file">Upload your SMILES strings (one per line, tab-delimited, no header)</label>
                <input type="file" id="file" accept=".csv,.txt,.smi,.tsv" onchange="readUpload(this);">
                <input type="hidden" id="upload" name="upload" value="">
                <a download="example_input.txt" href="data:text/plain;base64,{example}">Example input file</a>

                <h2>2. Choose Your Favorite Model</h2>
                <select id="model" name="model">
                    {options}
                </select>

                <h2>3. Make Prediction</h2>
                <input type="submit" value="Predict Activity">
            </form>
        </div>
        "#,
        smiles = escape_html(context.smiles),
        options = model_options(context),
        example = general_purpose::STANDARD.encode(EXAMPLE_UPLOAD),
    )
}

fn introduction(context: &PageContext) -> String {
    let logo = match context.logo_png {
        Some(bytes) => format!(
            r#"<img class="logo" src="data:image/png;base64,{}" alt="Malaria DHODH"/>"#,
            general_purpose::STANDARD.encode(bytes)
        ),
        None => String::new(),
    };
    format!(
        r#"
        <h1 class="title">MalariaDHODHPredicter</h1>
        <p>
            Small-molecule bioactivity prediction for malarial dihydroorotate dehydrogenase (DHODH).
        </p>
        <p>
            Predict how effectively a small-molecule compound inhibits the malarial DHODH enzyme,
            a validated drug target for combating malaria.
        </p>
        {logo}
        <p><strong>References</strong></p>
        <ul>
            <li>Malaria DHODH bioactivity data was retrieved from the <a href="{CHEMBL}" target="_blank">ChEMBL Database</a></li>
            <li>PubChem Sketcher can be used to draw chemical structures <a href="{PUBCHEM_SKETCHER}" target="_blank">[Link]</a></li>
            <li>Molecules are described by 2048-bit hashed atom-pair fingerprints</li>
        </ul>
        "#
    )
}

fn results_table(report: &PredictionReport) -> String {
    let mut html = format!(
        r#"<h1 class="results">Prediction Results:</h1>
        <p>Model: <strong>{model}</strong> ({label})</p>"#,
        model = report.model,
        label = report.model.label(),
    );

    if report.results.is_empty() {
        html.push_str("<p>None of the submitted molecules could be scored.</p>");
    } else {
        html.push_str(&format!(
            "<table><tr><th>#</th><th>{SMILES_COLUMN}</th><th>formula</th><th>{PIC50_COLUMN}</th><th>{IC50_COLUMN}</th></tr>"
        ));
        for result in &report.results {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                result.row,
                escape_html(&result.smiles),
                escape_html(&result.formula),
                format_pic50(result.pic50),
                format_ic50(result.ic50_nm),
            ));
        }
        html.push_str("</table>");

        match to_csv_string(report) {
            Ok(csv) => html.push_str(&format!(
                r#"<p><a download="prediction_results.csv" href="data:text/csv;base64,{}">Download results as CSV</a></p>"#,
                general_purpose::STANDARD.encode(csv)
            )),
            Err(e) => error!("Failed to build CSV download: {e:#}"),
        }
    }

    if !report.failures.is_empty() {
        html.push_str(&format!(
            r#"<div class="warning">{} molecule(s) could not be processed:</div>
            <table><tr><th>#</th><th>{SMILES_COLUMN}</th><th>reason</th></tr>"#,
            report.failures.len()
        ));
        for failure in &report.failures {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                failure.row,
                escape_html(&failure.smiles),
                escape_html(&failure.reason),
            ));
        }
        html.push_str("</table>");
    }
    html
}

/// Render the whole single-page app.
pub fn render_page(context: &PageContext, outcome: Outcome) -> String {
    let body = match outcome {
        Outcome::Nothing => String::new(),
        Outcome::Report(report) => results_table(report),
        Outcome::Error(message) => format!(
            r#"<div class="alert">{}</div>"#,
            escape_html(message).replace('\n', "<br>")
        ),
    };
    format!(
        r#"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <title>MalariaDHODHPredicter</title>
        <style>
            {GLOBAL_STYLES}
        </style>
        <script>
            {UPLOAD_SCRIPT}
        </script>
    </head>
    <body>
        {sidebar}
        <div class="container">
            {introduction}
            {body}
        </div>
    </body>
</html>
"#,
        sidebar = sidebar(context),
        introduction = introduction(context),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PredictionResult, RowFailure};

    fn context(registry: &ModelRegistry) -> PageContext<'_> {
        PageContext {
            registry,
            selected_model: ModelId::Lgbm,
            smiles: "C\"<script>",
            logo_png: Some(&[0x89, 0x50, 0x4e, 0x47]),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
    }

    #[test]
    fn test_index_page() {
        let registry = ModelRegistry::new("/nonexistent");
        let html = render_page(&context(&registry), Outcome::Nothing);
        assert!(html.contains("MalariaDHODHPredicter"));
        assert!(html.contains(r#"<option value="lgbm_model" selected>"#));
        assert!(html.contains("(unavailable)"));
        assert!(html.contains("value=\"C&quot;&lt;script&gt;\""));
        assert!(!html.contains("C\"<script>"));
        assert!(html.contains("data:image/png;base64,iVBORw"));
        assert!(!html.contains("Prediction Results"));

        let example = format!(
            r#"href="data:text/plain;base64,{}">Example input file</a>"#,
            general_purpose::STANDARD.encode(EXAMPLE_UPLOAD)
        );
        assert!(html.contains(&example));
    }

    #[test]
    fn test_example_upload_is_accepted() {
        let records = crate::parse_upload(EXAMPLE_UPLOAD.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        for record in records {
            assert!(crate::Molecule::from_smiles(&record.smiles).is_ok(), "{}", record.smiles);
        }
    }

    #[test]
    fn test_results_page() {
        let registry = ModelRegistry::new("/nonexistent");
        let report = PredictionReport {
            model: ModelId::Lgbm,
            results: vec![PredictionResult {
                row: 1,
                smiles: "CCO".to_string(),
                formula: "C2H6O".to_string(),
                heavy_atoms: 3,
                pic50: 5.0,
                ic50_nm: 10_000.0,
            }],
            failures: vec![RowFailure {
                row: 2,
                smiles: "<bad>".to_string(),
                reason: "Invalid SMILES".to_string(),
            }],
        };
        let html = render_page(&context(&registry), Outcome::Report(&report));
        assert!(html.contains("Prediction Results:"));
        assert!(html.contains("<td>5.000</td><td>10000</td>"));
        assert!(html.contains("data:text/csv;base64,"));
        assert!(html.contains("1 molecule(s) could not be processed"));
        assert!(html.contains("&lt;bad&gt;"));
    }

    #[test]
    fn test_error_page() {
        let registry = ModelRegistry::new("/nonexistent");
        let html = render_page(&context(&registry), Outcome::Error("No input provided".to_string()));
        assert!(html.contains(r#"<div class="alert">No input provided</div>"#));
    }
}
