use std::{
    env,
    fs::{self, File},
    io::{self, Read, Write},
    process::ExitCode,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::Sha256;
use surrogate::{
    Class, ExcType, Exception, ProxyBase, ProxyConfig, ProxyFactory, StderrTracer, Value, ops, original, state,
    types::Instance,
};

const USAGE: &str = "usage: surrogate <INPUT> [-o OUTPUT] [--digest md5|sha1|sha256] [--config FILE] [--trace]";

const CHUNK_SIZE: usize = 64 * 1024;

fn main() -> ExitCode {
    let options = match Options::parse(env::args().skip(1)) {
        Ok(Some(options)) => options,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("error: {err}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(&options) {
        Ok(hex) => {
            eprintln!("{} of {} is {hex}", options.algorithm.name(), options.input);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct Options {
    input: String,
    output: Option<String>,
    algorithm: Algorithm,
    config: Option<String>,
    trace: bool,
}

impl Options {
    /// Parses command line arguments; `Ok(None)` means help was requested.
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>, String> {
        let mut input = None;
        let mut output = None;
        let mut algorithm = Algorithm::Md5;
        let mut config = None;
        let mut trace = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "-o" | "--output" => output = Some(value_of(&arg, args.next())?),
                "--digest" => algorithm = Algorithm::parse(&value_of(&arg, args.next())?)?,
                "--config" => config = Some(value_of(&arg, args.next())?),
                "--trace" => trace = true,
                flag if flag.starts_with('-') && flag != "-" => return Err(format!("unknown option {flag}")),
                _ if input.is_some() => return Err(format!("unexpected argument {arg}")),
                _ => input = Some(arg),
            }
        }

        let input = input.ok_or("missing INPUT")?;
        Ok(Some(Self {
            input,
            output,
            algorithm,
            config,
            trace,
        }))
    }
}

fn value_of(flag: &str, value: Option<String>) -> Result<String, String> {
    value.ok_or_else(|| format!("{flag} requires a value"))
}

#[derive(Debug, Clone, Copy)]
enum Algorithm {
    Md5,
    Sha1,
    Sha256,
}

impl Algorithm {
    fn parse(name: &str) -> Result<Self, String> {
        match name {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!("unsupported digest {other:?}, expected md5, sha1 or sha256")),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

/// Digest of everything written so far, kept in the stream proxy's state record.
enum RunningDigest {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
}

impl RunningDigest {
    fn new(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Md5 => Self::Md5(Md5::new()),
            Algorithm::Sha1 => Self::Sha1(Sha1::new()),
            Algorithm::Sha256 => Self::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(hasher) => hasher.update(data),
            Self::Sha1(hasher) => hasher.update(data),
            Self::Sha256(hasher) => hasher.update(data),
        }
    }

    fn hexdigest(self) -> String {
        let bytes = match self {
            Self::Md5(hasher) => hasher.finalize().to_vec(),
            Self::Sha1(hasher) => hasher.finalize().to_vec(),
            Self::Sha256(hasher) => hasher.finalize().to_vec(),
        };
        bytes.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

type Output = Arc<Mutex<Box<dyn Write + Send>>>;

fn lock(output: &Output) -> MutexGuard<'_, Box<dyn Write + Send>> {
    output.lock().unwrap_or_else(PoisonError::into_inner)
}

fn os_error(err: &io::Error) -> Exception {
    ExcType::OSError.with_message(err)
}

/// A file-like class whose instances write to `output`.
fn sink_class(output: &Output) -> Arc<Class> {
    let writer = Arc::clone(output);
    let flusher = Arc::clone(output);
    Class::builder("Sink")
        .method("write", move |_this, args| {
            let [data] = args else {
                return Err(ExcType::type_error(format!(
                    "write() takes exactly one argument ({} given)",
                    args.len()
                )));
            };
            let bytes = data.as_bytes().ok_or_else(|| {
                ExcType::type_error(format!("a bytes-like object is required, not '{}'", data.type_name()))
            })?;
            lock(&writer).write_all(bytes).map_err(|err| os_error(&err))?;
            Ok(Value::Int(bytes.len() as i64))
        })
        .method("flush", move |_this, _args| {
            lock(&flusher).flush().map_err(|err| os_error(&err))?;
            Ok(Value::None)
        })
        .build()
}

/// Proxies of this base update their `RunningDigest` before every write.
fn digesting_base() -> Result<Arc<ProxyBase>, surrogate::ConstructionError> {
    ProxyBase::builder("digesting")
        .direct("write", |this, args| {
            if let Some(data) = args.first().and_then(Value::as_bytes)
                && let Some(digest) = state(this)?.ext_mut::<RunningDigest>()
            {
                digest.update(data);
            }
            ops::call_method(&original(this)?, "write", args)
        })
        .build()
}

fn run(options: &Options) -> Result<String, String> {
    let config = match &options.config {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(|err| format!("Error reading {path}: {err}"))?;
            ProxyConfig::from_json(&json).map_err(|err| err.to_string())?
        }
        None => ProxyConfig::default(),
    };
    let factory = if options.trace {
        ProxyFactory::with_tracer(config, StderrTracer::new())
    } else {
        ProxyFactory::with_config(config)
    };

    let mut input = File::open(&options.input).map_err(|err| format!("Error reading {}: {err}", options.input))?;
    let writer: Box<dyn Write + Send> = match &options.output {
        Some(path) => Box::new(File::create(path).map_err(|err| format!("Error creating {path}: {err}"))?),
        None => Box::new(io::stdout()),
    };
    let output: Output = Arc::new(Mutex::new(writer));

    let sink = Instance::create(&sink_class(&output), []);
    let base = digesting_base().map_err(|err| err.to_string())?;
    let stream = factory.proxy_with(sink, &base).map_err(|err| err.to_string())?;
    state(&stream)
        .map_err(|err| err.to_string())?
        .insert_ext(RunningDigest::new(options.algorithm));

    let mut buf = vec![0; CHUNK_SIZE];
    loop {
        let n = input
            .read(&mut buf)
            .map_err(|err| format!("Error reading {}: {err}", options.input))?;
        if n == 0 {
            break;
        }
        ops::call_method(&stream, "write", &[Value::bytes(&buf[..n])]).map_err(|err| err.to_string())?;
    }
    ops::call_method(&stream, "flush", &[]).map_err(|err| err.to_string())?;

    let digest = state(&stream)
        .map_err(|err| err.to_string())?
        .remove_ext::<RunningDigest>()
        .ok_or("stream lost its digest state")?;
    Ok(digest.hexdigest())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_options() {
        let options = Options::parse(args(&["in.txt", "-o", "out.txt", "--digest", "sha256", "--trace"]))
            .unwrap()
            .unwrap();
        assert_eq!(options.input, "in.txt");
        assert_eq!(options.output.as_deref(), Some("out.txt"));
        assert_eq!(options.algorithm.name(), "sha256");
        assert!(options.trace);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Options::parse(args(&[])).is_err());
        assert!(Options::parse(args(&["a", "b"])).is_err());
        assert!(Options::parse(args(&["a", "--digest", "crc"])).is_err());
        assert!(Options::parse(args(&["a", "-o"])).is_err());
        assert!(Options::parse(args(&["--help"])).unwrap().is_none());
    }

    #[test]
    fn digests_every_write() {
        let writer: Box<dyn Write + Send> = Box::new(Vec::<u8>::new());
        let buffer: Output = Arc::new(Mutex::new(writer));
        let stream = ProxyFactory::new()
            .proxy_with(Instance::create(&sink_class(&buffer), []), &digesting_base().unwrap())
            .unwrap();
        state(&stream).unwrap().insert_ext(RunningDigest::new(Algorithm::Md5));

        let written = ops::call_method(&stream, "write", &[Value::bytes(b"hello ")]).unwrap();
        assert_eq!(written, Value::Int(6));
        ops::call_method(&stream, "write", &[Value::bytes(b"world")]).unwrap();

        let digest = state(&stream).unwrap().remove_ext::<RunningDigest>().unwrap();
        assert_eq!(digest.hexdigest(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }
}
