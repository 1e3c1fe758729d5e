use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use restdot::cli::{BatchArgs, Cli, Commands, ScoreOpts, TaskNameArg};
use restdot::ctx::{Ctx, RunKey, UnitState};
use restdot::db::Store;
use restdot::error::RunError;
use restdot::fetch::LocalSync;
use restdot::maps;
use restdot::pipeline::Pipeline;
use restdot::pipeline::stage0_scaffold::Stage0Scaffold;
use restdot::pipeline::stage1_guard::Stage1Guard;
use restdot::pipeline::stage2_fetch::Stage2Fetch;
use restdot::pipeline::stage3_maps::Stage3Maps;
use restdot::pipeline::stage4_score::Stage4Score;
use restdot::pipeline::stage5_label::Stage5Label;
use restdot::pipeline::stage6_persist::Stage6Persist;
use restdot::setup;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => score_subjects(&args.opts, &args.subj, &args.sess),
        Commands::Batch(args) => {
            let subj = batch_subject(&args)?;
            score_subjects(&args.opts, &[subj], &args.sess)
        }
    }
}

/// Pick this worker's subject from the roster by array index, so one
/// scheduler array entry maps to one subject.
fn batch_subject(args: &BatchArgs) -> Result<String> {
    let store = Store::open(&args.opts.db)?;
    store.ensure_schema(&args.opts.project, &maps::default_emotions())?;
    let roster = store.subjects()?;
    if roster.is_empty() {
        anyhow::bail!("subject roster ref_subj is empty");
    }
    let idx = match args.array_index {
        Some(idx) => idx,
        None => std::env::var("ARRAY_TASK_ID")
            .context("--array-index not given and ARRAY_TASK_ID unset")?
            .parse::<usize>()
            .context("ARRAY_TASK_ID is not a number")?,
    };
    roster.get(idx).cloned().ok_or_else(|| {
        anyhow::anyhow!("array index {} out of range ({} subjects)", idx, roster.len())
    })
}

fn score_subjects(opts: &ScoreOpts, subjects: &[String], sessions: &[String]) -> Result<()> {
    std::fs::create_dir_all(&opts.work_dir)
        .with_context(|| format!("failed to create {}", opts.work_dir.display()))?;
    let emotions = maps::default_emotions();

    let store = Store::open(&opts.db)?;
    store.ensure_schema(&opts.project, &emotions)?;
    for subj in subjects {
        store.add_subject(subj)?;
    }

    let mut n_failed = 0usize;
    let mut units: Vec<RunKey> = Vec::new();
    for subj in subjects {
        for sess in sessions {
            match resolve_tasks(&store, opts.task_name, subj, sess) {
                Ok(tasks) => {
                    for task in tasks {
                        units.push(RunKey {
                            project: opts.project.clone(),
                            subj: subj.clone(),
                            sess: sess.clone(),
                            task,
                            model: opts.model.clone(),
                            contrast: opts.contrast.clone(),
                        });
                    }
                }
                Err(err) => {
                    n_failed += 1;
                    eprintln!("failed {} {} {} : task_resolution : {:#}", opts.project, subj, sess, err);
                }
            }
        }
    }
    drop(store);

    let fetch = LocalSync::new(opts.data_dir.clone());
    if !opts.skip_setup {
        let mut tasks: Vec<String> = units.iter().map(|k| k.task.clone()).collect();
        tasks.sort();
        tasks.dedup();
        for task in &tasks {
            setup::ensure_maps(
                &fetch,
                &opts.work_dir,
                &opts.mask_name,
                &opts.model,
                task,
                &opts.contrast,
                &emotions,
            )?;
        }
    }

    for key in units {
        match run_unit(opts, &fetch, key.clone(), emotions.clone()) {
            Ok(state) => println!("{} {}", state.as_str(), key),
            Err(err) => {
                n_failed += 1;
                let kind = err
                    .downcast_ref::<RunError>()
                    .map(RunError::kind)
                    .unwrap_or("error");
                eprintln!("failed {} : {} : {:#}", key, kind, err);
            }
        }
    }
    if n_failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_unit(
    opts: &ScoreOpts,
    fetch: &LocalSync,
    key: RunKey,
    emotions: Vec<String>,
) -> Result<UnitState> {
    let store = Store::open(&opts.db)?;
    let mut ctx = Ctx::new(
        key,
        &opts.work_dir,
        opts.mask_name.clone(),
        opts.mask_sig,
        opts.threads,
        emotions,
        store,
        env!("CARGO_PKG_VERSION"),
    );
    let pipeline = Pipeline::new(vec![
        Box::new(Stage0Scaffold::new()),
        Box::new(Stage1Guard::new()),
        Box::new(Stage2Fetch::new(Box::new(fetch.clone()))),
        Box::new(Stage3Maps::new()),
        Box::new(Stage4Score::new()),
        Box::new(Stage5Label::new()),
        Box::new(Stage6Persist::new()),
    ]);
    pipeline.run(&mut ctx)?;
    Ok(ctx.state)
}

fn resolve_tasks(
    store: &Store,
    mode: TaskNameArg,
    subj: &str,
    sess: &str,
) -> Result<Vec<String>> {
    match mode {
        TaskNameArg::Movies => Ok(vec!["movies".to_string()]),
        TaskNameArg::Scenarios => Ok(vec!["scenarios".to_string()]),
        TaskNameArg::Both => Ok(vec!["movies".to_string(), "scenarios".to_string()]),
        TaskNameArg::Match => {
            let task = store
                .session_task(subj, sess)?
                .with_context(|| format!("no task recorded for {subj} {sess} in ref_sess_task"))?;
            Ok(vec![task])
        }
    }
}
