//! Save/load demo entry point.
//!
//! # Responsibility
//! - Build a small organization graph, persist it through a worker pool and
//!   load it back by the root identity.
//! - Exercise the configured backend end to end (`REQGRAPH_*` variables).

use log::info;
use reqgraph_core::logging::init_from_config;
use reqgraph_core::{
    connect, EngineConfig, EngineError, GraphService, Organization, Product, Project,
    Requirement, Task,
};
use std::error::Error;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("reqgraph: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = EngineConfig::from_env()?;
    init_from_config(&config)?;
    let service = GraphService::from_config(&config)?;
    println!(
        "reqgraph_core version={} workers={}",
        reqgraph_core::core_version(),
        config.worker_threads
    );

    let org = sample_graph()?;
    let save = service.save(org.node())?;
    wait_for(save.as_ref(), || save.tree_save_complete())?;
    println!("saved {} nodes from {}", save.nodes_saved(), org.id_string());

    let load = service.load(&org.id_string())?;
    wait_for(load.as_ref(), || load.graph_loaded())?;
    let loaded = load.node().ok_or("load finished without a root node")?;
    let loaded_org = Organization::try_from(loaded)?;
    println!(
        "loaded {} nodes; organization {} is {:?}",
        load.nodes_loaded(),
        loaded_org.id_string(),
        loaded_org.name()
    );
    println!("{}", loaded_org.to_json_string());

    info!(
        "event=demo_run module=cli status=ok root={} saved={} loaded={}",
        org.id(),
        save.nodes_saved(),
        load.nodes_loaded()
    );
    service.pool().drain();
    service.pool().join();
    Ok(())
}

fn sample_graph() -> Result<Organization, Box<dyn Error>> {
    let org = Organization::new();
    org.set_name("Global Consolidated Software Engineering, Inc.")?;

    let project = Project::new();
    project.set_name("Next Generation Tooling")?;
    connect(&org, &project);

    let product = Product::new();
    product.set_title("Some Software")?;
    connect(&project, &product);

    for (title, functional) in [
        ("Software must be tested", true),
        ("Software must start in under a second", false),
    ] {
        let requirement = Requirement::new();
        requirement.set_title(title)?;
        requirement.set_functional(functional)?;
        connect(&product, &requirement);
    }
    Ok(org)
}

fn wait_for(task: &dyn Task, done: impl Fn() -> bool) -> Result<(), EngineError> {
    let deadline = Instant::now() + POLL_TIMEOUT;
    while !done() {
        if let Some(failure) = task.failure() {
            return Err(failure);
        }
        if Instant::now() >= deadline {
            return Err(EngineError::BackendUnavailable(format!(
                "{} task did not finish within {}s",
                task.name(),
                POLL_TIMEOUT.as_secs()
            )));
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}
