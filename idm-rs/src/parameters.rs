use std::path::PathBuf;

use idm_env::schema::{Arity, OptionKind, OptionSpec, Schema};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::actions::ActionIndexer;
use crate::error::{ModelError, Result};

pub const DEFAULT_WINDOW_WIDTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    MinCost,
    MaxReward,
}

/// Settings consumed by the policy iteration solver; validated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    #[serde(rename = "maxIter_PI")]
    pub max_iter_pi: usize,
    #[serde(rename = "maxIter_KSP")]
    pub max_iter_ksp: usize,
    #[serde(rename = "rtol_KSP")]
    pub rtol_ksp: f64,
    #[serde(rename = "atol_PI")]
    pub atol_pi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFiles {
    #[serde(default)]
    pub file_policy: Option<PathBuf>,
    #[serde(default)]
    pub file_cost: Option<PathBuf>,
    pub file_stats: PathBuf,
    #[serde(default, rename = "file_stageCosts")]
    pub file_stage_costs: Option<PathBuf>,
    #[serde(default)]
    pub file_transitions: Option<PathBuf>,
}

impl OutputFiles {
    pub fn log_absent(&self) {
        if self.file_policy.is_none() {
            log::info!(
                "Filename for policy not specified. Optimal policy will not be written to file."
            );
        }
        if self.file_cost.is_none() {
            log::info!(
                "Filename for cost not specified. Optimal cost will not be written to file."
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(rename = "populationSize")]
    pub population_size: usize,
    #[serde(rename = "discountFactor")]
    pub discount_factor: f64,
    /// Number of hygiene measure levels.
    #[serde(rename = "numHM")]
    pub num_a1: usize,
    /// Number of social distancing levels.
    #[serde(rename = "numSD")]
    pub num_a2: usize,
    /// Efficacy of each hygiene measure level.
    #[serde(rename = "HM")]
    pub r: Vec<f64>,
    /// Efficacy of each social distancing level.
    #[serde(rename = "SD")]
    pub lambda: Vec<f64>,
    #[serde(rename = "HM-cf")]
    pub cf_a1: Vec<f64>,
    #[serde(rename = "SD-cf")]
    pub cf_a2: Vec<f64>,
    #[serde(rename = "HM-cq")]
    pub cq_a1: Vec<f64>,
    #[serde(rename = "SD-cq")]
    pub cq_a2: Vec<f64>,
    /// Financial, quality of life and health cost weights.
    pub weights: [f64; 3],
    pub mode: Mode,
    #[serde(flatten)]
    pub solver: SolverSettings,
    #[serde(flatten)]
    pub files: OutputFiles,
    #[serde(rename = "numPIRuns")]
    pub num_runs: usize,
    #[serde(rename = "windowWidth")]
    pub window_width: usize,
    #[serde(rename = "numWorkers")]
    pub num_workers: usize,
}

impl Parameters {
    pub fn schema() -> Schema {
        let int = |min| OptionKind::Int { min };
        let per_hm = || OptionKind::RealArray(Arity::Option("numHM"));
        let per_sd = || OptionKind::RealArray(Arity::Option("numSD"));
        Schema::new(vec![
            OptionSpec::required("populationSize", int(1), "populationSize <int>"),
            OptionSpec::required(
                "discountFactor",
                OptionKind::Real,
                "discountFactor <double>",
            ),
            OptionSpec::required("numHM", int(1), "numHM <int>"),
            OptionSpec::required("numSD", int(1), "numSD <int>"),
            OptionSpec::required("HM", per_hm(), "HM [<double>; numHM]"),
            OptionSpec::required("SD", per_sd(), "SD [<double>; numSD]"),
            OptionSpec::required("HM-cf", per_hm(), "HM-cf [<double>; numHM]"),
            OptionSpec::required("SD-cf", per_sd(), "SD-cf [<double>; numSD]"),
            OptionSpec::required("HM-cq", per_hm(), "HM-cq [<double>; numHM]"),
            OptionSpec::required("SD-cq", per_sd(), "SD-cq [<double>; numSD]"),
            OptionSpec::required(
                "weights",
                OptionKind::RealArray(Arity::Fixed(3)),
                "weights [<financial cost>, <quality of life cost>, <health cost>]",
            ),
            OptionSpec::required("maxIter_PI", int(1), "maxIter_PI <int>"),
            OptionSpec::required("maxIter_KSP", int(1), "maxIter_KSP <int>"),
            OptionSpec::required("rtol_KSP", OptionKind::Real, "rtol_KSP <double>"),
            OptionSpec::required("atol_PI", OptionKind::Real, "atol_PI <double>"),
            OptionSpec::with_default("numPIRuns", int(1), json!(1), "numPIRuns <int>"),
            OptionSpec::optional("file_policy", OptionKind::String, "file_policy <string>"),
            OptionSpec::optional("file_cost", OptionKind::String, "file_cost <string>"),
            OptionSpec::required("file_stats", OptionKind::String, "file_stats <string>"),
            OptionSpec::required(
                "mode",
                OptionKind::Choice(&["MINCOST", "MAXREWARD"]),
                "mode MINCOST or MAXREWARD",
            ),
            OptionSpec::with_default(
                "windowWidth",
                int(0),
                json!(DEFAULT_WINDOW_WIDTH),
                "windowWidth <int>",
            ),
            OptionSpec::with_default("numWorkers", int(1), json!(1), "numWorkers <int>"),
            OptionSpec::optional(
                "file_stageCosts",
                OptionKind::String,
                "file_stageCosts <string>",
            ),
            OptionSpec::optional(
                "file_transitions",
                OptionKind::String,
                "file_transitions <string>",
            ),
        ])
    }

    /// Checks the invariants the schema cannot see when parameters are built
    /// in code rather than loaded from a run document.
    pub fn check(&self) -> Result<()> {
        let fail = |msg: String| Err(ModelError::Parameters(msg));
        if self.population_size == 0 {
            return fail("populationSize must be positive".to_string());
        }
        if self.num_a1 == 0 || self.num_a2 == 0 {
            return fail("numHM and numSD must be positive".to_string());
        }
        if self.num_workers == 0 {
            return fail("numWorkers must be positive".to_string());
        }
        for (name, values, expected) in [
            ("HM", &self.r, self.num_a1),
            ("HM-cf", &self.cf_a1, self.num_a1),
            ("HM-cq", &self.cq_a1, self.num_a1),
            ("SD", &self.lambda, self.num_a2),
            ("SD-cf", &self.cf_a2, self.num_a2),
            ("SD-cq", &self.cq_a2, self.num_a2),
        ] {
            if values.len() != expected {
                return fail(format!(
                    "{name} has {} values, expected {expected}",
                    values.len()
                ));
            }
        }
        Ok(())
    }

    pub fn actions(&self) -> ActionIndexer {
        ActionIndexer::new(self.num_a1, self.num_a2)
    }

    pub fn num_states(&self) -> usize {
        self.population_size + 1
    }

    pub fn num_actions(&self) -> usize {
        self.num_a1 * self.num_a2
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use idm_env::Environment;

    fn document() -> serde_json::Value {
        json!({
            "input": {
                "populationSize": 1000,
                "discountFactor": 0.98,
                "numHM": 2,
                "numSD": 3,
                "HM": [0.8, 0.4],
                "SD": [2.0, 1.0, 0.5],
                "HM-cf": [0.0, 1.0],
                "SD-cf": [0.0, 3.0, 6.0],
                "HM-cq": [1.0, 0.9],
                "SD-cq": [1.0, 0.7, 0.3],
                "weights": [1.0, 1.0, 0.1],
                "maxIter_PI": 50,
                "maxIter_KSP": 1000,
                "rtol_KSP": 1e-4,
                "atol_PI": 1e-8,
                "file_stats": "stats.json",
                "file_cost": "cost.out",
                "mode": "MAXREWARD"
            }
        })
    }

    #[test]
    fn test_load_from_document() {
        let env = Environment::from_json(document())
            .with_schema::<Parameters>(&Parameters::schema())
            .unwrap();
        let params = env.input.unwrap();
        params.check().unwrap();
        assert_eq!(params.population_size, 1000);
        assert_eq!(params.num_states(), 1001);
        assert_eq!(params.num_actions(), 6);
        assert_eq!(params.mode, Mode::MaxReward);
        assert_eq!(params.lambda, vec![2.0, 1.0, 0.5]);
        assert_eq!(params.solver.max_iter_pi, 50);
        assert_eq!(params.files.file_cost, Some(PathBuf::from("cost.out")));
        assert_eq!(params.files.file_policy, None);
        assert_eq!(params.num_runs, 1);
        assert_eq!(params.window_width, DEFAULT_WINDOW_WIDTH);
        assert_eq!(params.num_workers, 1);
    }

    #[test]
    fn test_missing_and_malformed_options_are_all_reported() {
        let mut doc = document();
        let input = doc["input"].as_object_mut().unwrap();
        input.remove("populationSize");
        input.remove("file_stats");
        input.insert("SD-cq".to_string(), json!([1.0, 0.7]));
        input.insert("mode".to_string(), json!("MINIMIZE"));
        let err = Environment::from_json(doc)
            .with_schema::<Parameters>(&Parameters::schema())
            .err()
            .unwrap();
        match err {
            idm_env::EnvError::Config(errors) => {
                assert_eq!(errors.len(), 4);
                for option in ["populationSize", "file_stats", "SD-cq", "mode"] {
                    assert!(errors.mentions(option), "{option} not reported");
                }
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_rejects_mismatched_vectors() {
        let mut params = test_support::five_by_four(10);
        params.cq_a2.pop();
        assert!(matches!(params.check(), Err(ModelError::Parameters(_))));
    }
}
