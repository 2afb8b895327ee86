use std::fs;
use std::path::Path;
use tradeflow_analysis::Pipeline;
use tradeflow_core::{ConfigLoader, Field};
use tradeflow_data::CsvStorage;

const CONFIG: &str = r#"
[inputs]
trade_dir = "raw"
file_pattern = "{reporter}_{year}.csv"
gdp_file = "reference/gdp.csv"
gravity_file = "reference/gravity.csv"
countries = ["ROM"]
years = [2011, 2012]

[inputs.country_aliases]
ROU = "ROM"

[outputs]
dir = "out"

[analysis]
top_n = 2
robust = false
dependents = ["ln_trade_value"]
fixed_effects = ["partner", "year"]
"#;

const PARTNERS: [(&str, f64, u8); 4] = [
    ("DEU", 1300.0, 0),
    ("ITA", 1150.0, 0),
    ("HUN", 640.0, 0),
    ("MDA", 430.0, 1),
];
const PRODUCTS: [&str; 3] = ["271011", "870323", "847130"];

fn write_inputs(root: &Path) {
    fs::create_dir_all(root.join("raw")).unwrap();
    fs::create_dir_all(root.join("reference")).unwrap();

    let mut gdp = String::from("country,year,gdp\n");
    let mut gravity = String::from("iso_o,iso_d,dist,comlang_off\n");
    for (p, (partner, dist, lang)) in PARTNERS.iter().enumerate() {
        gravity.push_str(&format!("ROU,{partner},{dist},{lang}\n"));
        for (y, year) in [2011, 2012].iter().enumerate() {
            let value = 1.0e11 * (p as f64 + 1.5) * (1.0 + 0.05 * y as f64 + 0.01 * p as f64 * y as f64);
            gdp.push_str(&format!("{partner},{year},{value}\n"));
        }
    }
    fs::write(root.join("reference/gdp.csv"), gdp).unwrap();
    fs::write(root.join("reference/gravity.csv"), gravity).unwrap();

    for (y, year) in [2011, 2012].iter().enumerate() {
        let mut body = String::from(
            "reporter,partner,partner_name,trade_flow,product_code,product_description,trade_value,quantity_unit,year\n",
        );
        for flow in ["Import", "Export"] {
            for (p, (partner, _, _)) in PARTNERS.iter().enumerate() {
                for (k, product) in PRODUCTS.iter().enumerate() {
                    let value = 50.0 * (p + 1) as f64 + 20.0 * k as f64 + ((p * 3 + k * 5 + y * 7) % 11) as f64;
                    body.push_str(&format!(
                        "ROM,{partner},{partner},{flow},{product},Goods,{value},Kg,{year}\n"
                    ));
                }
            }
        }
        fs::write(root.join(format!("raw/ROM_{year}.csv")), body).unwrap();
    }
}

#[test]
fn test_toml_config_drives_a_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("Config.toml");
    fs::write(&config_path, CONFIG).unwrap();
    write_inputs(dir.path());

    let config = ConfigLoader::load(&config_path).unwrap().rebased(dir.path());
    assert_eq!(config.analysis.fixed_effects, vec![Field::Partner, Field::Year]);
    // unset output file names fall back to defaults
    assert_eq!(config.outputs.summary_file, "summary_statistics.csv");

    let output = Pipeline::new(&config).run().unwrap();
    assert_eq!(output.fits.len(), 4);
    assert!(output.fits.iter().all(|f| !f.result.robust));
    assert_eq!(output.diagnostics.joins["gravity"].unmatched_rows, 0);

    for (file, table) in output.reports(&config.outputs) {
        CsvStorage::write_table(&config.outputs.path(file), table).unwrap();
    }
    let baseline = fs::read_to_string(dir.path().join("out/regression_baseline.csv")).unwrap();
    assert!(baseline.starts_with("variable,ln_trade_value_import,ln_trade_value_export"));
    assert!(baseline.contains("\nN,"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("Config.toml");
    fs::write(&config_path, CONFIG.replace("top_n = 2", "top_n = 0")).unwrap();
    assert!(ConfigLoader::load(&config_path).is_err());
}
