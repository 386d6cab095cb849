use std::collections::HashMap;

use regex::Regex;

fn last_match_as_f64(re: &Regex, text: &str) -> Option<f64> {
    re.captures_iter(text).last().and_then(|c| c.get(1)?.as_str().parse::<f64>().ok())
}

fn all_matches_as_f64(re: &Regex, text: &str) -> Vec<f64> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
        .collect()
}

/// Extracts residual/time/lift/drag metrics from CFD solver logs.
///
/// Stable scraping contract: `residual_final_last`, `residual_final_mean`,
/// `time_last`, and (when present) `Cl_last`/`Cd_last`.
pub fn parse_cfd_metrics(text: &str) -> HashMap<String, f64> {
    let mut metrics = HashMap::new();
    let num = r"([0-9eE+\-.]+)";

    let residual_re = Regex::new(&format!(r"Final residual\s*=\s*{num}")).unwrap();
    let residuals = all_matches_as_f64(&residual_re, text);
    if !residuals.is_empty() {
        metrics.insert("residual_final_last".to_string(), *residuals.last().unwrap());
        metrics.insert(
            "residual_final_mean".to_string(),
            residuals.iter().sum::<f64>() / residuals.len() as f64,
        );
    }

    let time_re = Regex::new(&format!(r"Time\s*=\s*{num}")).unwrap();
    if let Some(v) = last_match_as_f64(&time_re, text) {
        metrics.insert("time_last".to_string(), v);
    }

    let cl_re = Regex::new(&format!(r"\bCl\b\s*=\s*{num}")).unwrap();
    if let Some(v) = last_match_as_f64(&cl_re, text) {
        metrics.insert("Cl_last".to_string(), v);
    }

    let cd_re = Regex::new(&format!(r"\bCd\b\s*=\s*{num}")).unwrap();
    if let Some(v) = last_match_as_f64(&cd_re, text) {
        metrics.insert("Cd_last".to_string(), v);
    }

    metrics
}

/// Extracts thermodynamic metrics from molecular dynamics solver logs.
///
/// Stable scraping contract: `PotEng_last`, `Temp_last`, `Press_last`.
pub fn parse_md_metrics(text: &str) -> HashMap<String, f64> {
    let mut metrics = HashMap::new();
    let num = r"([0-9eE+\-.]+)";

    let pe_re = Regex::new(&format!(r"\bPotEng\b\s*=\s*{num}")).unwrap();
    if let Some(v) = last_match_as_f64(&pe_re, text) {
        metrics.insert("PotEng_last".to_string(), v);
    }

    let temp_re = Regex::new(&format!(r"\bTemp\b\s*=\s*{num}")).unwrap();
    if let Some(v) = last_match_as_f64(&temp_re, text) {
        metrics.insert("Temp_last".to_string(), v);
    }

    let press_re = Regex::new(&format!(r"\bPress\b\s*=\s*{num}")).unwrap();
    if let Some(v) = last_match_as_f64(&press_re, text) {
        metrics.insert("Press_last".to_string(), v);
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cfd_metrics_pull_last_and_mean_residual() {
        let log = "Solving for Ux, Final residual = 1.0e-03\nSolving for Uy, Final residual = 2.0e-03\nTime = 12.5\nCl = 0.45\nCd = 0.02";
        let metrics = parse_cfd_metrics(log);
        assert_eq!(metrics["residual_final_last"], 2.0e-03);
        assert_eq!(metrics["residual_final_mean"], 1.5e-03);
        assert_eq!(metrics["time_last"], 12.5);
        assert_eq!(metrics["Cl_last"], 0.45);
        assert_eq!(metrics["Cd_last"], 0.02);
    }

    #[test]
    fn cfd_metrics_empty_on_unrecognized_log() {
        let metrics = parse_cfd_metrics("nothing useful here");
        assert!(metrics.is_empty());
    }

    #[test]
    fn md_metrics_pull_last_thermo_values() {
        let log = "Step 0 PotEng = -123.4 Temp = 300.0 Press = 1.01\nStep 1 PotEng = -124.1 Temp = 299.5 Press = 1.00";
        let metrics = parse_md_metrics(log);
        assert_eq!(metrics["PotEng_last"], -124.1);
        assert_eq!(metrics["Temp_last"], 299.5);
        assert_eq!(metrics["Press_last"], 1.00);
    }
}
