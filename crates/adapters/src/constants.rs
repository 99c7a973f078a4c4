//! Provider endpoints and verification request parameters
//!
//! These are public API coordinates, not secrets. Base URLs are overridable
//! per adapter (`with_base_url`) so tests can point at local mock servers.

/// Prompt used by every completion-style check.
pub const CHECK_PROMPT: &str = "Just say \"a\"";

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
/// Cheapest reasoning model; its per-tier limits are what `openai::TIERS` encodes.
pub const OPENAI_MODEL: &str = "gpt-5-nano";

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GOOGLE_MODEL: &str = "gemini-2.5-flash-lite";

pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai";

/// `{region}` is substituted per attempt.
pub const BEDROCK_ENDPOINT_TEMPLATE: &str = "https://bedrock-runtime.{region}.amazonaws.com";
pub const BEDROCK_MODEL: &str = "anthropic.claude-3-haiku-20240307-v1:0";
pub const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
/// SigV4 signing name for the Bedrock runtime.
pub const BEDROCK_SIGNING_SERVICE: &str = "bedrock";

/// Bedrock regions in the order they are tried.
pub const BEDROCK_REGIONS: &[&str] = &[
    "us-east-1",      // US East (N. Virginia)
    "us-east-2",      // US East (Ohio)
    "us-west-1",      // US West (N. California)
    "us-west-2",      // US West (Oregon)
    "us-gov-east-1",  // AWS GovCloud (US-East)
    "us-gov-west-1",  // AWS GovCloud (US-West)
    "ca-central-1",   // Canada (Central)
    "ca-west-1",      // Canada West (Calgary)
    "mx-central-1",   // Mexico (Central)
    "sa-east-1",      // South America (Sao Paulo)
    "eu-west-1",      // Europe (Ireland)
    "eu-west-2",      // Europe (London)
    "eu-west-3",      // Europe (Paris)
    "eu-central-1",   // Europe (Frankfurt)
    "eu-central-2",   // Europe (Zurich)
    "eu-north-1",     // Europe (Stockholm)
    "eu-south-1",     // Europe (Milan)
    "eu-south-2",     // Europe (Spain)
    "ap-east-2",      // Asia Pacific (Taipei)
    "ap-northeast-1", // Asia Pacific (Tokyo)
    "ap-northeast-2", // Asia Pacific (Seoul)
    "ap-northeast-3", // Asia Pacific (Osaka)
    "ap-south-1",     // Asia Pacific (Mumbai)
    "ap-south-2",     // Asia Pacific (Hyderabad)
    "ap-southeast-1", // Asia Pacific (Singapore)
    "ap-southeast-2", // Asia Pacific (Sydney)
    "ap-southeast-3", // Asia Pacific (Jakarta)
    "ap-southeast-4", // Asia Pacific (Melbourne)
    "ap-southeast-5", // Asia Pacific (Malaysia)
    "ap-southeast-7", // Asia Pacific (Thailand)
    "il-central-1",   // Israel (Tel Aviv)
    "me-central-1",   // Middle East (UAE)
    "me-south-1",     // Middle East (Bahrain)
    "af-south-1",     // Africa (Cape Town)
];
