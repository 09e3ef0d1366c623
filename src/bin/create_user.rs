use std::{io, path::PathBuf, process::exit};

use clap::Parser;
use rusqlite::Connection;

use statement_keeper::{
    Email, Error, PasswordHash, Role, ValidatedPassword, create_user, initialize_db,
};

/// A utility for adding a user who can manage statements.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The email address of the new user.
    email: String,

    /// The password of the new user. You will be prompted for it if omitted.
    password: Option<String>,

    /// A role to grant the user, may be repeated.
    #[arg(long = "role", default_value = Role::ADMIN)]
    roles: Vec<String>,

    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH")]
    db_path: PathBuf,
}

fn main() {
    let args = Args::parse();

    let email = Email::new(&args.email).unwrap_or_else(|error| fail(error));
    let roles = args
        .roles
        .iter()
        .map(|role| Role::new(role))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|error| fail(error));

    let password = match args.password {
        Some(password) => {
            ValidatedPassword::new(&password, &[email.as_ref()]).unwrap_or_else(|error| fail(error))
        }
        None => match prompt_password(&email) {
            Some(password) => password,
            None => return,
        },
    };
    let password_hash =
        PasswordHash::new(password, PasswordHash::DEFAULT_COST).unwrap_or_else(|error| fail(error));

    let connection = Connection::open(&args.db_path).unwrap_or_else(|error| {
        fail(format!(
            "could not open the database at {:?}: {error}",
            args.db_path
        ))
    });
    initialize_db(&connection).unwrap_or_else(|error| fail(error));

    match create_user(email, roles, password_hash, &connection) {
        Ok(user) => {
            let roles: Vec<&str> = user.roles.iter().map(|role| role.as_ref()).collect();
            println!(
                "Created user {} <{}> with roles {}",
                user.id,
                user.email,
                roles.join(", ")
            );
        }
        Err(error @ Error::DuplicateEmail(_)) => fail(error),
        Err(error) => fail(format!("could not create the user: {error}")),
    }
}

/// Ask for the password twice until it is strong and both entries match.
///
/// Returns `None` if stdin is closed.
fn prompt_password(email: &Email) -> Option<ValidatedPassword> {
    loop {
        println!();

        let first_password = read_password("Enter a password: ")?;

        let password = match ValidatedPassword::new(&first_password, &[email.as_ref()]) {
            Ok(password) => password,
            Err(error) => {
                print_error(error);
                continue;
            }
        };

        let second_password = read_password("Enter the same password again: ")?;

        if first_password != second_password {
            print_error(Error::PasswordsDoNotMatch);
            continue;
        }

        return Some(password);
    }
}

fn read_password(prompt: &str) -> Option<String> {
    match rpassword::prompt_password(prompt) {
        Ok(password) => Some(password),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

fn fail(error: impl ToString) -> ! {
    print_error(error);
    exit(1);
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
