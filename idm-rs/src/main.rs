use std::process::ExitCode;

use anyhow::Context;
use idm::generator::{GeneratedModel, ModelGenerator};
use idm::output::{self, RunStatistics};
use idm::parameters::Parameters;
use idm_env::Environment;

fn main() -> ExitCode {
    let log_env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(log_env).init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    // The run document comes from the path in the first argument, or stdin.
    let env = match std::env::args_os().nth(1) {
        Some(path) => Environment::from_path(&path)
            .with_context(|| format!("loading {}", path.to_string_lossy()))?,
        None => Environment::from_stdin()?,
    };
    let env = env.with_schema::<Parameters>(&Parameters::schema())?;
    let params = env.input.as_ref().context("validated input is missing")?;
    log::debug!("{params:?}");
    params.files.log_absent();
    log::info!("rayon threads: {}", rayon::current_num_threads());

    let generator = ModelGenerator::new(params)?;
    let mut stats = RunStatistics::new(
        env.input_json().clone(),
        env.fingerprint(),
        params.num_states(),
        params.num_actions(),
    );

    let last_run = params.num_runs - 1;
    stats.runs = generator.generate_runs(|model, report| {
        if report.run == last_run {
            export(&env, params, &model)?;
        }
        Ok(())
    })?;

    let path = env
        .write_json(&params.files.file_stats, &stats)
        .context("writing statistics")?;
    log::info!("statistics written to {}", path.display());
    Ok(())
}

fn export(
    env: &Environment<Parameters>,
    params: &Parameters,
    model: &GeneratedModel,
) -> idm::Result<()> {
    if let Some(file) = &params.files.file_stage_costs {
        let path = env.write_csv(
            file,
            &output::STAGE_COST_HEADERS,
            output::stage_cost_rows(&model.stage_costs),
        )?;
        log::info!("stage costs written to {}", path.display());
    }
    if let Some(file) = &params.files.file_transitions {
        let path = env.write_csv(
            file,
            &output::TRANSITION_HEADERS,
            output::transition_rows(&model.transitions, params.num_actions()),
        )?;
        log::info!("transition probabilities written to {}", path.display());
    }
    Ok(())
}
