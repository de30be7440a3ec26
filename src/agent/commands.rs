use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::protocol::{self, Signal};
use crate::prelude::*;
use async_trait::async_trait;

/// A diagnostic command forwarded to the agent of a running process
#[async_trait(?Send)]
pub trait AgentCommand {
    fn name(&self) -> &'static str;

    /// One-line summary shown in the usage text
    fn description(&self) -> &'static str;

    async fn execute(&self, addr: SocketAddr, params: &[String]) -> Result<()>;
}

/// Commands available by name, in the order they are listed in the usage text
pub struct CommandTable {
    commands: Vec<Box<dyn AgentCommand>>,
}

impl CommandTable {
    pub fn empty() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Add a command, replacing any command registered under the same name
    pub fn register(&mut self, command: Box<dyn AgentCommand>) {
        match self.commands.iter().position(|c| c.name() == command.name()) {
            Some(i) => self.commands[i] = command,
            None => self.commands.push(command),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn AgentCommand> {
        self.commands
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn AgentCommand> {
        self.commands.iter().map(|c| c.as_ref())
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(Box::new(SignalCommand {
            name: "stack",
            description: "Prints the stack trace.",
            signal: Signal::StackTrace,
            print_response: true,
        }));
        table.register(Box::new(SignalCommand {
            name: "gc",
            description: "Runs the garbage collector and blocks until successful.",
            signal: Signal::Gc,
            print_response: false,
        }));
        table.register(Box::new(SetGcPercentCommand));
        table.register(Box::new(SignalCommand {
            name: "memstats",
            description: "Prints the allocation and garbage collection stats.",
            signal: Signal::MemStats,
            print_response: true,
        }));
        table.register(Box::new(SignalCommand {
            name: "version",
            description: "Prints the Go version used to build the program.",
            signal: Signal::Version,
            print_response: true,
        }));
        table.register(Box::new(SignalCommand {
            name: "stats",
            description: "Prints the vital runtime stats.",
            signal: Signal::Stats,
            print_response: true,
        }));
        table.register(Box::new(TraceCommand));
        table.register(Box::new(ProfileCommand {
            name: "pprof-heap",
            description: "Reads the heap profile and launches \"go tool pprof\".",
            signal: Signal::HeapProfile,
        }));
        table.register(Box::new(ProfileCommand {
            name: "pprof-cpu",
            description: "Reads the CPU profile and launches \"go tool pprof\".",
            signal: Signal::CpuProfile,
        }));
        table
    }
}

/// Send `signal` with `payload` and copy the answer to `out`
async fn forward(
    addr: SocketAddr,
    signal: Signal,
    payload: &[u8],
    out: &mut impl Write,
) -> Result<()> {
    let response = protocol::request(addr, signal, payload).await?;
    out.write_all(&response)?;
    out.flush()?;
    Ok(())
}

/// Commands that are a single signal without parameters
struct SignalCommand {
    name: &'static str,
    description: &'static str,
    signal: Signal,
    print_response: bool,
}

#[async_trait(?Send)]
impl AgentCommand for SignalCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    async fn execute(&self, addr: SocketAddr, _params: &[String]) -> Result<()> {
        if self.print_response {
            forward(addr, self.signal, &[], &mut std::io::stdout()).await
        } else {
            protocol::request(addr, self.signal, &[]).await?;
            Ok(())
        }
    }
}

struct SetGcPercentCommand;

fn gc_percent_payload(params: &[String]) -> Result<Vec<u8>> {
    let percent = params.first().ok_or_else(|| anyhow!("missing gc percentage"))?;
    let percent: i64 = percent
        .parse()
        .context(format!("Invalid gc percentage {percent:?}"))?;
    protocol::encode_varint(percent)
}

#[async_trait(?Send)]
impl AgentCommand for SetGcPercentCommand {
    fn name(&self) -> &'static str {
        "setgc"
    }

    fn description(&self) -> &'static str {
        "Sets the garbage collection target percentage."
    }

    async fn execute(&self, addr: SocketAddr, params: &[String]) -> Result<()> {
        let payload = gc_percent_payload(params)?;
        forward(addr, Signal::SetGcPercent, &payload, &mut std::io::stdout()).await
    }
}

/// Write `data` to a temporary file that outlives the program
fn save_dump(prefix: &str, data: &[u8]) -> Result<PathBuf> {
    let (mut file, path) = tempfile::Builder::new()
        .prefix(prefix)
        .tempfile()?
        .keep()?;
    file.write_all(data)?;
    Ok(path)
}

fn run_go_tool(tool: &str, args: &[&Path]) -> Result<()> {
    debug!("Launching go tool {tool} {args:?}");
    let status = Command::new("go")
        .arg("tool")
        .arg(tool)
        .args(args)
        .status()
        .context(format!("Failed to launch \"go tool {tool}\""))?;
    ensure!(status.success(), "\"go tool {tool}\" exited with {status}");
    Ok(())
}

struct ProfileCommand {
    name: &'static str,
    description: &'static str,
    signal: Signal,
}

#[async_trait(?Send)]
impl AgentCommand for ProfileCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    async fn execute(&self, addr: SocketAddr, _params: &[String]) -> Result<()> {
        if self.signal == Signal::CpuProfile {
            println!("Profiling CPU now, will take 30 secs...");
        }
        let profile = protocol::request(addr, self.signal, &[]).await?;
        ensure!(!profile.is_empty(), "failed to read the profile");
        let profile_path = save_dump("profile", &profile)?;
        println!("Profile dump saved to: {}", profile_path.display());

        let binary = protocol::request(addr, Signal::BinaryDump, &[])
            .await
            .context("couldn't retrieve running binary's dump")?;
        ensure!(!binary.is_empty(), "failed to read the binary");
        let mut binary_file = tempfile::Builder::new().prefix("binary").tempfile()?;
        binary_file.write_all(&binary)?;
        binary_file.flush()?;

        run_go_tool("pprof", &[binary_file.path(), &profile_path])
    }
}

struct TraceCommand;

#[async_trait(?Send)]
impl AgentCommand for TraceCommand {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn description(&self) -> &'static str {
        "Runs the runtime tracer for 5 secs and launches \"go tool trace\"."
    }

    async fn execute(&self, addr: SocketAddr, _params: &[String]) -> Result<()> {
        println!("Tracing now, will take 5 secs...");
        let trace = protocol::request(addr, Signal::Trace, &[]).await?;
        ensure!(!trace.is_empty(), "nothing has traced");
        let trace_path = save_dump("trace", &trace)?;
        println!("Trace dump saved to: {}", trace_path.display());

        run_go_tool("trace", &[&trace_path])
    }
}
