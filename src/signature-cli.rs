//! A CLI tool for working with signature artifacts outside the browser.
//! It uses the same rendering and derivation code as the voting flow, so an
//! artifact produced here derives the same voter key.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use signedvoting_backend::{
    chain::{Pubkey, RpcChainClient},
    crypto::{ArtifactDigest, DerivationError, DerivedVoterIdentity},
    pipeline::{HttpProposalDirectory, VerificationSession, VerificationState},
    signature::{rasterise, vectorise, Signature, SignatureArtifact},
};

const PROGRAM_NAME: &str = "signature-cli";

const ABOUT_TEXT: &str = "Render, inspect and verify signature vote artifacts.

EXIT CODES:
     0: Success (for `verify`: a vote was found).
   255: Ran successfully, but no vote matches the artifact.
 Other: Error.";

const STROKES: &str = "STROKES";
const USER_ID: &str = "USER_ID";
const PNG: &str = "PNG";
const OUT: &str = "out";
const SVG: &str = "svg";
const PROPOSAL: &str = "proposal";
const RPC: &str = "rpc";
const PROGRAM_ID: &str = "program-id";
const BACKEND: &str = "backend";
const COOKIE: &str = "cookie";

const STROKES_HELP: &str = "Path to a JSON array of strokes, each an array of\n\
[x, y] or [x, y, pressure] samples";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    let user_id = || {
        Arg::new(USER_ID)
            .help("The voter's user ID")
            .action(ArgAction::Set)
            .required(true)
    };
    let png = || {
        Arg::new(PNG)
            .help("Path to the signature artifact")
            .action(ArgAction::Set)
            .required(true)
    };

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .subcommand(
            Command::new("render")
                .about("Render strokes to a signature artifact")
                .arg(
                    Arg::new(STROKES)
                        .help(STROKES_HELP)
                        .action(ArgAction::Set)
                        .required(true),
                )
                .arg(user_id())
                .arg(
                    Arg::new(OUT)
                        .long(OUT)
                        .help("Where to write the PNG")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new(PROPOSAL)
                        .long(PROPOSAL)
                        .help("Proposal ID, used for the default file name")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("0"),
                )
                .arg(
                    Arg::new(SVG)
                        .long(SVG)
                        .help("Also write the vector image as SVG")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print the digests and voter key of an artifact")
                .arg(user_id())
                .arg(png()),
        )
        .subcommand(
            Command::new("verify")
                .about("Find the vote cast with an artifact")
                .arg(user_id())
                .arg(png())
                .arg(
                    Arg::new(RPC)
                        .long(RPC)
                        .help("Chain JSON-RPC endpoint")
                        .action(ArgAction::Set)
                        .required(true),
                )
                .arg(
                    Arg::new(PROGRAM_ID)
                        .long(PROGRAM_ID)
                        .help("Voting program address")
                        .value_parser(clap::value_parser!(Pubkey))
                        .required(true),
                )
                .arg(
                    Arg::new(BACKEND)
                        .long(BACKEND)
                        .help("Base URL of the proposal backend")
                        .action(ArgAction::Set)
                        .required(true),
                )
                .arg(
                    Arg::new(COOKIE)
                        .long(COOKIE)
                        .help("Session cookie to send to the backend")
                        .action(ArgAction::Set),
                ),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the strokes file.
    Format(String),
    Render(String),
    Derivation(DerivationError),
}

/// The public facts about an artifact.
#[derive(Debug, Eq, PartialEq)]
struct Inspection {
    artifact_digest: ArtifactDigest,
    voter: Pubkey,
}

impl Inspection {
    fn of(user_id: &str, artifact: &[u8]) -> Result<Self, Error> {
        let artifact_digest = ArtifactDigest::of(artifact).map_err(Error::Derivation)?;
        let voter = DerivedVoterIdentity::derive(user_id, artifact)
            .map_err(Error::Derivation)?
            .public_key();
        Ok(Self {
            artifact_digest,
            voter,
        })
    }

    fn print(&self) {
        println!("Artifact digest (D1):     {}", self.artifact_digest);
        println!(
            "Verification digest (D2): {}",
            self.artifact_digest.verification_digest()
        );
        println!("Voter public key:         {}", self.voter);
    }
}

fn read(path: &Path) -> Result<Vec<u8>, Error> {
    fs::read(path).map_err(|e| Error::IO(format!("{}: {e}", path.display())))
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    fs::write(path, bytes).map_err(|e| Error::IO(format!("{}: {e}", path.display())))
}

/// Render the strokes file, write the artifact (and optionally SVG), and
/// return where the PNG went.
fn render(
    strokes: &Path,
    user_id: &str,
    out: Option<PathBuf>,
    proposal: u32,
    svg: Option<&Path>,
) -> Result<(PathBuf, Inspection), Error> {
    let signature: Signature =
        serde_json::from_slice(&read(strokes)?).map_err(|e| Error::Format(e.to_string()))?;
    let image = vectorise(&signature);
    let artifact = rasterise(&image).map_err(|e| Error::Render(e.to_string()))?;
    let inspection = Inspection::of(user_id, artifact.as_bytes())?;

    let out = out.unwrap_or_else(|| PathBuf::from(SignatureArtifact::filename(proposal)));
    write(&out, artifact.as_bytes())?;
    if let Some(svg) = svg {
        write(svg, image.to_svg().as_bytes())?;
    }
    Ok((out, inspection))
}

fn report_error(err: Error) -> u8 {
    match err {
        Error::IO(msg) => println!("IO error: {msg}"),
        Error::Format(msg) => println!("Invalid strokes file: {msg}"),
        Error::Render(msg) => println!("Could not render signature: {msg}"),
        Error::Derivation(err) => println!("Could not derive voter key: {err}"),
    }
    1
}

fn run_render(args: &ArgMatches) -> u8 {
    // Required arguments are guaranteed to be present.
    let strokes: &String = args.get_one(STROKES).unwrap();
    let user_id: &String = args.get_one(USER_ID).unwrap();
    let proposal: u32 = *args.get_one(PROPOSAL).unwrap();
    let out = args.get_one::<String>(OUT).map(PathBuf::from);
    let svg = args.get_one::<String>(SVG).map(Path::new);
    match render(Path::new(strokes), user_id, out, proposal, svg) {
        Ok((out, inspection)) => {
            println!("Wrote {}", out.display());
            inspection.print();
            0
        }
        Err(err) => report_error(err),
    }
}

fn run_inspect(args: &ArgMatches) -> u8 {
    let user_id: &String = args.get_one(USER_ID).unwrap();
    let png: &String = args.get_one(PNG).unwrap();
    match read(Path::new(png)).and_then(|artifact| Inspection::of(user_id, &artifact)) {
        Ok(inspection) => {
            inspection.print();
            0
        }
        Err(err) => report_error(err),
    }
}

fn run_verify(args: &ArgMatches) -> u8 {
    let user_id: &String = args.get_one(USER_ID).unwrap();
    let png: &String = args.get_one(PNG).unwrap();
    let rpc: &String = args.get_one(RPC).unwrap();
    let program_id: Pubkey = *args.get_one(PROGRAM_ID).unwrap();
    let backend: &String = args.get_one(BACKEND).unwrap();
    let cookie = args.get_one::<String>(COOKIE).cloned();

    let artifact = match read(Path::new(png)) {
        Ok(artifact) => artifact,
        Err(err) => return report_error(err),
    };
    let chain = RpcChainClient::new(rpc.as_str(), "confirmed", 1, Default::default());
    let directory = HttpProposalDirectory::new(backend.as_str(), cookie);
    let mut session = VerificationSession::new(program_id, &chain, &directory);

    match rocket::execute(session.verify(user_id, &artifact)) {
        VerificationState::Verified(vote) => {
            println!("Vote found.");
            println!("Vote account: {}", vote.vote_account);
            println!("Proposal:     {} ({})", vote.proposal_name, vote.proposal_id);
            match vote.choice_label {
                Some(ref label) => println!("Choice:       {label}"),
                None => println!("Choice:       #{} (unknown)", vote.choice_index),
            }
            // Compare with the commitment the backend reports as vote status.
            println!("D2:           {}", vote.verification_digest);
            0
        }
        VerificationState::NotFound => {
            println!("No vote was cast with this signature.");
            255
        }
        VerificationState::Error(msg) => {
            println!("Verification error: {msg}");
            1
        }
        VerificationState::Idle | VerificationState::Processing => 1,
    }
}

/// Run the chosen subcommand, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    match args.subcommand() {
        Some(("render", args)) => run_render(args),
        Some(("inspect", args)) => run_inspect(args),
        Some(("verify", args)) => run_verify(args),
        _ => 1, // Subcommand is required.
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{PROGRAM_NAME}-{}-{name}", std::process::id()))
    }

    #[test]
    fn render_and_inspect() {
        let out = temp_path("square.png");
        let svg = temp_path("square.svg");
        let (written, rendered) = render(
            Path::new("example_signatures/square.json"),
            "42",
            Some(out.clone()),
            7,
            Some(&svg),
        )
        .unwrap();
        assert_eq!(written, out);
        assert!(fs::read_to_string(&svg).unwrap().starts_with("<svg"));

        // Rendering is deterministic, and inspecting the file agrees.
        let again = render(
            Path::new("example_signatures/square.json"),
            "42",
            Some(temp_path("square2.png")),
            7,
            None,
        )
        .unwrap()
        .1;
        assert_eq!(rendered, again);
        let inspected = Inspection::of("42", &fs::read(&out).unwrap()).unwrap();
        assert_eq!(rendered, inspected);

        // Another user derives another key from the same artifact.
        let other = Inspection::of("43", &fs::read(&out).unwrap()).unwrap();
        assert_eq!(other.artifact_digest, rendered.artifact_digest);
        assert_ne!(other.voter, rendered.voter);
    }

    #[test]
    fn render_errors() {
        let out = Some(temp_path("never.png"));
        assert!(matches!(
            render(Path::new("example_signatures/malformed.json"), "42", out.clone(), 0, None),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            render(Path::new("example_signatures/empty.json"), "42", out.clone(), 0, None),
            Err(Error::Render(_))
        ));
        assert!(matches!(
            render(Path::new("example_signatures/cross.json"), "", out.clone(), 0, None),
            Err(Error::Derivation(DerivationError::MissingIdentity))
        ));
        assert!(matches!(
            render(Path::new("not a real file"), "42", out, 0, None),
            Err(Error::IO(_))
        ));
    }

    #[test]
    fn correct_cli_usage() {
        let out = temp_path("cli.png");
        let out = out.to_str().unwrap();
        let command_line = [
            PROGRAM_NAME,
            "render",
            "example_signatures/cross.json",
            "42",
            "--out",
            out,
        ];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        let command_line = [PROGRAM_NAME, "inspect", "42", out];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        let command_line = [PROGRAM_NAME, "inspect", "42", "not a real file"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);

        // Nothing listens on the discard port.
        let command_line = [
            PROGRAM_NAME,
            "verify",
            "42",
            out,
            "--rpc",
            "http://127.0.0.1:9",
            "--program-id",
            "8Z52ChpaMPvvnSVjSrQmJirxiqpuNvQSprUebVWXyaCs",
            "--backend",
            "http://127.0.0.1:9",
        ];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);
    }

    #[test]
    fn bad_cli_usage() {
        // No subcommand.
        let command_line = [PROGRAM_NAME];
        cli().try_get_matches_from(command_line).unwrap_err();

        // Missing user ID.
        let command_line = [PROGRAM_NAME, "inspect", "file.png"];
        cli().try_get_matches_from(command_line).unwrap_err();

        // Malformed program ID.
        let command_line = [
            PROGRAM_NAME,
            "verify",
            "42",
            "file.png",
            "--rpc",
            "http://localhost:8899",
            "--program-id",
            "not-base58!",
            "--backend",
            "http://localhost:8000",
        ];
        cli().try_get_matches_from(command_line).unwrap_err();
    }
}
