use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bughunter::resolver::{AlwaysAllow, AlwaysDeny, Consent, ExecutableProbe, PathProbe};
use bughunter::{
    Capability, CommandRunner, DependencyResolver, Extension, Gateway, Registry, RunInput, RunResult,
    SystemRunner, ToolError, tools,
};

/// Probe that reports a fixed set of binaries and counts lookups.
struct Probe {
    present: Vec<&'static str>,
    lookups: AtomicUsize,
}

impl Probe {
    fn new(present: &[&'static str]) -> Arc<Self> {
        Arc::new(Self { present: present.to_vec(), lookups: AtomicUsize::new(0) })
    }
}

impl ExecutableProbe for Probe {
    fn probe(&self, name: &str) -> bool {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.present.iter().any(|p| *p == name)
    }
}

/// Runner that records commands instead of executing them.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl Recorder {
    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for Recorder {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<RunResult> {
        self.calls.lock().unwrap().push((program.to_string(), args.to_vec()));
        Ok(RunResult::new(format!("{} {}", program, args.join(" ")), "", 0))
    }
}

fn gateway_with(runner: Arc<Recorder>, probe: Arc<Probe>, consent: Arc<dyn Consent>) -> Gateway {
    let discovery = Registry::discover(tools::default_extensions(runner.clone(), None));
    assert!(discovery.diagnostics.is_empty());
    let resolver = DependencyResolver::new(probe, consent, runner).with_os("linux");
    Gateway::new(Arc::new(discovery.registry), resolver)
}

#[tokio::test]
async fn test_builtin_nikto_end_to_end() {
    let runner = Arc::new(Recorder::default());
    let gateway = gateway_with(runner.clone(), Probe::new(&["nikto"]), Arc::new(AlwaysDeny));

    let result = gateway
        .dispatch("nikto", RunInput::new().with("url", "https://example.com"), None)
        .await
        .unwrap();

    assert_eq!(result.stdout, "nikto -h https://example.com");
    assert_eq!(runner.calls().len(), 1);
}

#[tokio::test]
async fn test_batch_continues_after_failures() {
    let runner = Arc::new(Recorder::default());
    let gateway = gateway_with(runner.clone(), Probe::new(&["nmap", "subfinder"]), Arc::new(AlwaysDeny))
        .with_interactive(false);

    let jobs = [
        ("nikto", RunInput::new().with("url", "https://example.com")),
        ("unknown", RunInput::new()),
        ("dirsearch", RunInput::new().with("url", "ftp://example.com")),
        ("nmap", RunInput::new().with("host", "example.com")),
        ("subfinder", RunInput::new().with("domain", "--help")),
        ("subfinder", RunInput::new().with("domain", "example.com")),
    ];

    let mut outcomes = Vec::new();
    for (key, input) in jobs {
        outcomes.push(gateway.dispatch(key, input, None).await);
    }

    assert!(matches!(outcomes[0], Err(ToolError::UnsatisfiedDependency { .. })));
    assert!(matches!(outcomes[1], Err(ToolError::UnknownCapability(_))));
    assert!(matches!(outcomes[2], Err(ToolError::InvalidLocator { .. })));
    assert_eq!(outcomes[3].as_ref().unwrap().stdout, "nmap -sV example.com");
    assert!(matches!(outcomes[4], Err(ToolError::InvalidParameter { .. })));
    assert_eq!(outcomes[5].as_ref().unwrap().stdout, "subfinder -silent -d example.com");

    let programs: Vec<String> = runner.calls().into_iter().map(|(p, _)| p).collect();
    assert_eq!(programs, vec!["nmap", "subfinder"]);
}

#[tokio::test]
async fn test_stray_url_rejected_for_host_tools() {
    let runner = Arc::new(Recorder::default());
    let gateway = gateway_with(runner.clone(), Probe::new(&["nmap"]), Arc::new(AlwaysAllow));

    let input = RunInput::new().with("host", "example.com").with("url", "javascript:alert(1)");
    let err = gateway.dispatch("nmap", input, None).await.unwrap_err();

    assert!(matches!(err, ToolError::InvalidLocator { .. }));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_consented_install_that_leaves_tool_absent() {
    let runner = Arc::new(Recorder::default());
    // The recorder does not really install, so nmap stays absent after the attempt.
    let gateway = gateway_with(runner.clone(), Probe::new(&["apt-get"]), Arc::new(AlwaysAllow));

    let err = gateway
        .dispatch("nmap", RunInput::new().with("host", "example.com"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ToolError::UnsatisfiedDependency { ref missing } if missing == &vec!["nmap".to_string()]));
    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "sudo");
    assert_eq!(calls[0].1, vec!["apt-get", "install", "-y", "nmap"]);
}

#[tokio::test]
async fn test_empty_dependencies_probe_nothing() {
    struct Noop;

    #[async_trait]
    impl Capability for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn dependencies(&self) -> &[String] {
            &[]
        }

        async fn run(&self, _input: &RunInput) -> Result<RunResult, ToolError> {
            Ok(RunResult::new("", "", 0))
        }
    }

    let probe = Probe::new(&[]);
    let discovery = Registry::discover(vec![Extension::from_capabilities("test", vec![Arc::new(Noop) as Arc<dyn Capability>])]);
    let resolver = DependencyResolver::new(probe.clone(), Arc::new(AlwaysDeny), Arc::new(Recorder::default()));
    let gateway = Gateway::new(Arc::new(discovery.registry), resolver);

    gateway.dispatch("noop", RunInput::new(), None).await.unwrap();
    assert_eq!(probe.lookups.load(Ordering::SeqCst), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_manifest_tool_runs_real_process() {
    let ext_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        ext_dir.path().join("greet.yaml"),
        "name: greet\nprogram: sh\nargs: ['-c', 'printf \"hello %s\" \"$0\"', '{name}']\n",
    )
    .unwrap();

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let discovery = Registry::discover(tools::default_extensions(runner.clone(), Some(ext_dir.path())));
    assert!(discovery.diagnostics.is_empty(), "{:?}", discovery.diagnostics);

    let resolver = DependencyResolver::new(Arc::new(PathProbe), Arc::new(AlwaysDeny), runner);
    let gateway = Gateway::new(Arc::new(discovery.registry), resolver).with_interactive(false);

    let out_dir = tempfile::tempdir().unwrap();
    let path = out_dir.path().join("greet.txt");
    let result = gateway
        .dispatch("greet", RunInput::new().with("name", "operator"), Some(&path))
        .await
        .unwrap();

    assert_eq!(result, RunResult::new("hello operator", "", 0));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello operator");
}
