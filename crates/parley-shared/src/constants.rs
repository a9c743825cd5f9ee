/// Application name
pub const APP_NAME: &str = "Parley";

/// Separator placed between the two sorted participant ids of a conversation id
pub const CONVERSATION_ID_SEPARATOR: char = '_';

/// Top-level collection of user profiles, keyed by user id
pub const USERS_COLLECTION: &str = "users";

/// Top-level collection of conversation records, keyed by conversation id
pub const CHATS_COLLECTION: &str = "chats";

/// Sub-collection of a chat document holding its messages
pub const MESSAGES_COLLECTION: &str = "messages";

/// User document fields
pub const FIELD_USER_ID: &str = "id";
pub const FIELD_USER_NAME: &str = "name";
pub const FIELD_USER_EMAIL: &str = "email";
pub const FIELD_USER_AVATAR: &str = "avatarURL";

/// Chat document fields
pub const FIELD_PARTICIPANTS: &str = "participants";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_LAST_MESSAGE: &str = "lastMessage";
pub const FIELD_LAST_UPDATED: &str = "lastUpdated";

/// Message document fields
pub const FIELD_SENDER_ID: &str = "senderID";
pub const FIELD_BODY: &str = "message";
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_STATUS: &str = "status";

/// Day key format used to group messages (stable, re-parsable)
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Medium-form date used as the default section label, e.g. "Oct 17, 2026"
pub const SECTION_LABEL_FORMAT: &str = "%b %-d, %Y";
