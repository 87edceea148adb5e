use clap::Args;
use innovision::error::AppError;
use innovision::workflows::admin::hash_password;

#[derive(Args, Debug)]
pub(crate) struct HashPasswordArgs {
    /// Password to hash for the ADMIN_PASSWORD_HASH environment variable
    #[arg(long)]
    pub(crate) password: String,
}

/// Provisioning helper: the printed hash goes into `ADMIN_PASSWORD_HASH` and
/// the matching address into `ADMIN_LOGIN_EMAIL`; the server seeds the
/// administrator from those at startup.
pub(crate) fn run_hash_password(args: HashPasswordArgs) -> Result<(), AppError> {
    let hash = hash_password(&args.password)?;
    println!("{hash}");
    Ok(())
}
