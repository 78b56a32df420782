//! Sign-in, sign-out and profile handlers.

use solfin_core::{AppContext, ProfileUpdate, RegisterRequest, User};

use crate::cli::{GlobalOpts, LoginArgs, ProfileArgs, RegisterArgs};
use crate::error::CliError;
use crate::output;

use super::util;

fn user_detail(user: &User) -> String {
    let mut lines = vec![
        format!("Name:     {}", user.display_name()),
        format!("Email:    {}", user.email),
    ];
    if let Some(phone) = &user.phone {
        lines.push(format!("Phone:    {phone}"));
    }
    if let Some(currency) = &user.currency {
        lines.push(format!("Currency: {currency}"));
    }
    lines.push(format!("ID:       {}", user.id));
    lines.join("\n")
}

fn print_user(user: &User, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, user, user_detail, |u| u.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn login(ctx: &AppContext, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let password = util::read_password(&args.password_env)?;
    let user = ctx.auth().login(&args.email, &password).await?;
    print_user(&user, global)
}

pub async fn register(
    ctx: &AppContext,
    args: RegisterArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let password = util::read_password(&args.password_env)?;
    let user = ctx
        .auth()
        .register(RegisterRequest {
            email: args.email,
            password,
            first_name: args.first_name,
            last_name: args.last_name,
            phone: args.phone,
        })
        .await?;
    print_user(&user, global)
}

pub async fn logout(ctx: &AppContext) -> Result<(), CliError> {
    ctx.logout().await?;
    Ok(())
}

pub async fn whoami(ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    let user = ctx.auth().fetch_profile().await?;
    print_user(&user, global)
}

pub async fn update_profile(
    ctx: &AppContext,
    args: ProfileArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let update = ProfileUpdate {
        first_name: args.first_name,
        last_name: args.last_name,
        phone: args.phone,
        currency: args.currency,
    };
    let user = ctx.auth().update_profile(update).await?;
    print_user(&user, global)
}
