use std::io::{stdin, stdout, Write};

use anyhow::{anyhow, Result};

use crate::settings::{Conf, ConfigFile, DEFAULT_PAYDAY};

fn to_conf(api_key: &str, client_id: &str, client_secret: &str, payday: &str) -> Result<Conf> {
    if api_key.is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    if client_id.is_empty() {
        return Err(anyhow!("client ID must not be empty"));
    }

    if client_secret.is_empty() {
        return Err(anyhow!("client secret must not be empty"));
    }

    let payday = match payday {
        "" => DEFAULT_PAYDAY,
        p => match p.parse::<u32>() {
            Ok(day) if (1..=31).contains(&day) => day,
            _ => return Err(anyhow!("payday must be a day of month between 1 and 31")),
        },
    };

    Ok(Conf::new(
        api_key.to_string(),
        client_id.to_string(),
        client_secret.to_string(),
        payday,
    ))
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    stdout().flush()?;

    let mut buf = String::new();
    stdin().read_line(&mut buf)?;

    Ok(buf.trim().to_string())
}

pub(crate) async fn run(conf_path: Option<&str>) -> Result<()> {
    let path = match conf_path {
        Some(p) => p.into(),
        None => ConfigFile::default_config_path()?,
    };

    let api_key = prompt("API key")?;
    let client_id = prompt("Client ID")?;
    let client_secret = prompt("Client secret")?;
    let payday = prompt(&format!("Payday, day of month [{}]", DEFAULT_PAYDAY))?;

    let conf = ConfigFile::create(path, to_conf(&api_key, &client_id, &client_secret, &payday)?)?;
    println!(
        "Configuration written to {}. Run `{} link` to authorize access.",
        conf.path().display(),
        crate::CLIENT_NAME
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payday_defaults_when_blank() {
        let conf = to_conf("key", "id", "secret", "").unwrap();
        assert_eq!(conf.payday, DEFAULT_PAYDAY);
        assert!(conf.refresh_token.is_empty());
    }

    #[test]
    fn rejects_invalid_input() {
        let tests = vec![
            ("", "id", "secret", "1", "API key must not be empty"),
            ("key", "", "secret", "1", "client ID must not be empty"),
            ("key", "id", "", "1", "client secret must not be empty"),
            ("key", "id", "secret", "0", "payday must be a day of month between 1 and 31"),
            ("key", "id", "secret", "abc", "payday must be a day of month between 1 and 31"),
        ];

        for t in tests {
            assert_eq!(to_conf(t.0, t.1, t.2, t.3).unwrap_err().to_string(), t.4);
        }
    }
}
