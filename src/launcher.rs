//! Starting the workload.
//!
//! The workload is always an external program. [`runtime_launcher`] builds the
//! container runtime invocation that benchmon exists to measure; anything else
//! can be run through a plain [`CommandLauncher`].

use std::{
    ffi::OsString,
    fs,
    io,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
};

use serde::Deserialize;

use crate::{
    collection::processes::Pid,
    constants::{
        DEFAULT_FLAVOR, DEFAULT_RUNTIME, INSECURE_IMAGE_ARG, POD_MANIFEST_KIND,
        RUNTIME_NETWORK_ARG,
    },
    options::BenchOptions,
};

/// Spawns a program with a fixed argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLauncher {
    program: PathBuf,
    args: Vec<OsString>,
    show_output: bool,
}

impl CommandLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            show_output: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Whether the workload's stdout and stderr are passed through. They are
    /// discarded otherwise.
    pub fn show_output(mut self, show_output: bool) -> Self {
        self.show_output = show_output;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Starts the workload. Fails if the program can't be started at all.
    pub fn launch(&self) -> io::Result<Workload> {
        let output = || {
            if self.show_output {
                Stdio::inherit()
            } else {
                Stdio::null()
            }
        };

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(output())
            .stderr(output())
            .spawn()?;

        log::debug!(
            "launched {} as pid {}",
            self.program.display(),
            child.id()
        );

        Ok(Workload { child })
    }
}

/// A running workload. Only the root process is owned here; its descendants
/// are found through the process table.
#[derive(Debug)]
pub struct Workload {
    child: Child,
}

impl Workload {
    pub fn pid(&self) -> Pid {
        self.child.id() as Pid
    }

    /// Waits for the root process to go away, killing it first if it is still
    /// running.
    pub fn reap(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        if let Err(err) = self.child.kill() {
            // It may have exited in between; wait() below will tell.
            log::debug!("failed to kill pid {}: {err}", self.child.id());
        }

        self.child.wait()
    }
}

#[derive(Deserialize)]
struct ManifestKind {
    #[serde(rename = "acKind")]
    ac_kind: String,
}

/// Whether `contents` is a pod manifest, as opposed to an image.
pub fn is_pod_manifest(contents: &[u8]) -> bool {
    serde_json::from_slice::<ManifestKind>(contents)
        .is_ok_and(|manifest| manifest.ac_kind == POD_MANIFEST_KIND)
}

/// The name of the stage1 flavor in use, taken from the stage1 image's file
/// name.
pub fn flavor(stage1_path: Option<&Path>) -> String {
    stage1_path
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_FLAVOR.to_string())
}

/// The path of the runtime binary, either inside `runtime_dir` or left to be
/// looked up in `PATH`.
pub fn runtime_binary(runtime_dir: Option<&Path>) -> PathBuf {
    match runtime_dir {
        Some(dir) => dir.join(DEFAULT_RUNTIME),
        None => PathBuf::from(DEFAULT_RUNTIME),
    }
}

/// Builds the launcher that runs the image or pod manifest in `options` with
/// the container runtime.
pub fn runtime_launcher(options: &BenchOptions) -> io::Result<CommandLauncher> {
    let contents = fs::read(&options.image)?;
    let pod_manifest = is_pod_manifest(&contents);
    log::debug!(
        "treating {} as {}",
        options.image.display(),
        if pod_manifest { "a pod manifest" } else { "an image" }
    );

    let mut launcher = CommandLauncher::new(runtime_binary(options.runtime_dir.as_deref()))
        .arg("run")
        .show_output(options.show_output);

    if let Some(stage1_path) = &options.stage1_path {
        let mut arg = OsString::from("--stage1-path=");
        arg.push(stage1_path);
        launcher = launcher.arg(arg);
    }

    launcher = if pod_manifest {
        launcher.arg("--pod-manifest").arg(&options.image)
    } else {
        launcher.arg(&options.image).arg(INSECURE_IMAGE_ARG)
    };

    Ok(launcher.arg(RUNTIME_NETWORK_ARG))
}
