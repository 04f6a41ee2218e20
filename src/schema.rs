use sea_query::Iden;

/// Metadata table - key-value store for database configuration
#[derive(Iden)]
pub enum Metadata {
    Table,
    Key,
    Value,
}

/// Users table - registered uploaders and their secret tokens
#[derive(Iden)]
pub enum Users {
    Table,
    UserId,
    Token,
    Username,
    CreatedAtMs,
}

/// Audio table - transcoded MP3 payloads owned by a user
#[derive(Iden)]
pub enum Audio {
    Table,
    AudioId,
    OwnerId,
    DisplayName,
    RetrievalUrl,
    Payload,
    CreatedAtMs,
}
