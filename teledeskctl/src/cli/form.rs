//! Flag parsing and interactive prompts for the `users add` form.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow, bail};
use dialoguer::{Confirm, Input, Select};

use teledesk_model::{NewAddress, NewUser, UserId, UserRole, validate_photo_url};

use super::users::AddArgs;

/// Address fields as collected from the form, before a user id exists.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressInput {
    pub country: String,
    pub city: String,
    pub street: String,
    pub building: String,
    pub appartment: Option<String>,
    pub postal_code: String,
}

impl AddressInput {
    pub fn into_new_address(self, user_id: UserId) -> NewAddress {
        NewAddress {
            user_id,
            country: self.country,
            city: self.city,
            street: self.street,
            building: self.building,
            appartment: self.appartment,
            postal_code: self.postal_code,
            is_deleted: None,
        }
    }
}

/// Parse one `--extra KEY=VALUE` occurrence.
pub fn parse_extra(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got {raw:?}"))?;
    if key.trim().is_empty() {
        bail!("extra field key must not be empty in {raw:?}");
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Parse one `--address` occurrence:
/// `country,city,street,building[,appartment],postal_code`.
pub fn parse_address(raw: &str) -> Result<AddressInput> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let (appartment, postal_code) = match parts.len() {
        5 => (None, parts[4]),
        6 => (Some(parts[4].to_string()), parts[5]),
        other => bail!("expected 5 or 6 comma-separated fields, got {other} in {raw:?}"),
    };
    if parts.iter().any(|part| part.is_empty()) {
        bail!("address fields must not be empty in {raw:?}");
    }
    Ok(AddressInput {
        country: parts[0].to_string(),
        city: parts[1].to_string(),
        street: parts[2].to_string(),
        building: parts[3].to_string(),
        appartment,
        postal_code: postal_code.to_string(),
    })
}

/// Fill whatever `users add --interactive` did not get from flags.
pub fn prompt_missing(args: AddArgs) -> Result<(NewUser, Vec<AddressInput>)> {
    let telegram_uid = match args.telegram_uid {
        Some(value) => value,
        None => Input::new()
            .with_prompt("Telegram UID")
            .interact_text()
            .context("prompt aborted")?,
    };
    let first_name = prompt_required("First name", args.first_name)?;
    let last_name = prompt_required("Last name", args.last_name)?;
    let tg_username = prompt_optional("Telegram username (optional)", args.tg_username)?;
    let photo_url = match prompt_optional("Photo URL (optional)", args.photo_url)? {
        Some(raw) => {
            validate_photo_url(&raw)?;
            Some(raw)
        }
        None => None,
    };

    let role_id = match args.role {
        Some(raw) => Some(UserRole::try_from(raw).context("unknown --role")?),
        None => {
            let roles = [UserRole::Admin, UserRole::Moderator, UserRole::User];
            let labels: Vec<String> = roles.iter().map(|role| role.to_string()).collect();
            let picked = Select::new()
                .with_prompt("Role")
                .items(&labels)
                .default(2)
                .interact()
                .context("prompt aborted")?;
            Some(roles[picked])
        }
    };

    let mut extra_fields: HashMap<String, String> = args
        .extra
        .iter()
        .map(|raw| parse_extra(raw))
        .collect::<Result<_>>()?;
    loop {
        let key: String = Input::new()
            .with_prompt("Extra field key (blank to finish)")
            .allow_empty(true)
            .interact_text()
            .context("prompt aborted")?;
        if key.trim().is_empty() {
            break;
        }
        let value: String = Input::new()
            .with_prompt(format!("Value for {key:?}"))
            .allow_empty(true)
            .interact_text()
            .context("prompt aborted")?;
        extra_fields.insert(key.trim().to_string(), value);
    }

    let mut address_inputs: Vec<AddressInput> = args
        .address
        .iter()
        .map(|raw| parse_address(raw))
        .collect::<Result<_>>()?;
    while address_inputs.is_empty()
        || Confirm::new()
            .with_prompt("Add another address?")
            .default(false)
            .interact()
            .context("prompt aborted")?
    {
        address_inputs.push(prompt_address()?);
    }

    let new_user = NewUser {
        telegram_uid,
        first_name,
        last_name,
        tg_username,
        photo_url,
        role_id,
        created_at: None,
        extra_fields,
    };
    Ok((new_user, address_inputs))
}

fn prompt_required(label: &str, preset: Option<String>) -> Result<String> {
    if let Some(value) = preset {
        return Ok(value);
    }
    loop {
        let value: String = Input::new()
            .with_prompt(label)
            .allow_empty(true)
            .interact_text()
            .context("prompt aborted")?;
        if !value.trim().is_empty() {
            return Ok(value);
        }
        eprintln!("{label} must not be empty.");
    }
}

fn prompt_optional(label: &str, preset: Option<String>) -> Result<Option<String>> {
    if preset.is_some() {
        return Ok(preset);
    }
    let value: String = Input::new()
        .with_prompt(label)
        .allow_empty(true)
        .interact_text()
        .context("prompt aborted")?;
    Ok((!value.trim().is_empty()).then_some(value))
}

fn prompt_address() -> Result<AddressInput> {
    let country = prompt_required("Country", None)?;
    let city = prompt_required("City", None)?;
    let street = prompt_required("Street", None)?;
    let building = prompt_required("Building", None)?;
    let appartment = prompt_optional("Apartment (optional)", None)?;
    let postal_code = prompt_required("Postal code", None)?;
    Ok(AddressInput {
        country,
        city,
        street,
        building,
        appartment,
        postal_code,
    })
}
