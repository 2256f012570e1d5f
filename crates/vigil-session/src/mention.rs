/// Extracts the user id from a platform mention token: `<@123>` or the
/// nickname form `<@!123>`. Ids are opaque digit strings.
pub fn parse_user_mention(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("<@")?.strip_suffix('>')?;
    let id = inner.strip_prefix('!').unwrap_or(inner);
    is_snowflake(id).then_some(id)
}

/// Extracts the channel id from a `<#123>` token.
pub fn parse_channel_mention(text: &str) -> Option<&str> {
    let id = text.trim().strip_prefix("<#")?.strip_suffix('>')?;
    is_snowflake(id).then_some(id)
}

fn is_snowflake(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|byte| byte.is_ascii_digit())
}
