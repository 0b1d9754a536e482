//! Chat commands: parsing and plain-text replies.

use crate::models::{TargetSpec, TrackedProduct, format_brl, percent_below};
use crate::product_manager::{AddTrackingOutcome, ProductManager};
use crate::tracker::ProductCheckResult;
use crate::utils::error::AppError;

pub const HELP_TEXT: &str = "🤖 Price Watch Bot

Available commands:

/add <url> <target> - Start tracking a product
  /add https://www.mercadolivre.com.br/... 3000   (alert at R$ 3000.00 or less)
  /add https://www.mercadolivre.com.br/... 15%    (alert at 15% off or more)
  Both targets may be given: /add <url> 3000 15%

/list - List tracked products
/remove <id> - Stop tracking a product
/check <id> - Check a product's price now
/help - Show this message";

const ADD_USAGE: &str = "❌ Wrong format.\n\nUsage: /add <url> <target price> or /add <url> <discount%>\n\nExample: /add https://www.mercadolivre.com.br/product 3000\nExample: /add https://www.mercadolivre.com.br/product 15%";
const UNAUTHORIZED: &str = "You are not authorized to use this bot.";
const UNKNOWN_COMMAND: &str = "Unknown command. Use /help to see the available commands.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Add { args: Vec<String> },
    List,
    Remove { arg: Option<String> },
    Check { arg: Option<String> },
    Unknown(String),
}

impl Command {
    /// Parses a message. Text that is not a command yields `None`.
    ///
    /// The command word is case-insensitive and may carry an `@botname` suffix.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?;
        if !head.starts_with('/') {
            return None;
        }

        let command = head.split('@').next().unwrap_or(head).to_lowercase();
        let args: Vec<String> = parts.map(str::to_string).collect();

        Some(match command.as_str() {
            "/start" => Command::Start,
            "/help" => Command::Help,
            "/add" => Command::Add { args },
            "/list" => Command::List,
            "/remove" => Command::Remove { arg: args.into_iter().next() },
            "/check" => Command::Check { arg: args.into_iter().next() },
            _ => Command::Unknown(command),
        })
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Command::Start | Command::Help)
    }
}

/// Executes chat commands against the product manager.
#[derive(Clone)]
pub struct CommandHandler {
    manager: ProductManager,
    authorized_chat_id: Option<i64>,
}

impl CommandHandler {
    pub fn new(manager: ProductManager, authorized_chat_id: Option<i64>) -> Self {
        Self {
            manager,
            authorized_chat_id,
        }
    }

    /// Reply for a message from `chat_id`, `None` when the message is not a command.
    pub async fn handle(&self, chat_id: i64, text: &str) -> Option<String> {
        let command = Command::parse(text)?;

        if !command.is_public() {
            if let Some(authorized) = self.authorized_chat_id {
                if authorized != chat_id {
                    tracing::warn!(chat_id, "Rejected command from unauthorized chat");
                    return Some(UNAUTHORIZED.to_string());
                }
            }
        }

        tracing::debug!(chat_id, ?command, "Handling command");

        let reply = match command {
            Command::Start | Command::Help => HELP_TEXT.to_string(),
            Command::Add { args } => self.add(&args).await,
            Command::List => self.list().await,
            Command::Remove { arg } => self.remove(arg.as_deref()).await,
            Command::Check { arg } => self.check(arg.as_deref()).await,
            Command::Unknown(_) => UNKNOWN_COMMAND.to_string(),
        };
        Some(reply)
    }

    async fn add(&self, args: &[String]) -> String {
        let (url, targets) = match args {
            [url, targets @ ..] if (1..=2).contains(&targets.len()) => (url, targets),
            _ => return ADD_USAGE.to_string(),
        };

        let targets = match TargetSpec::parse_tokens(targets.iter().map(String::as_str)) {
            Ok(targets) => targets,
            Err(e) => return error_reply(&e, "Could not add product"),
        };

        match self.manager.add_tracking(url, targets).await {
            Ok(outcome) => format_added(&outcome),
            Err(e) => error_reply(&e, "Could not add product"),
        }
    }

    async fn list(&self) -> String {
        match self.manager.list_active().await {
            Ok(products) if products.is_empty() => "📋 No products are being tracked right now.".to_string(),
            Ok(products) => {
                let mut reply = String::from("📋 Tracked products:\n\n");
                for product in &products {
                    reply.push_str(&format_product_entry(product));
                    reply.push('\n');
                }
                reply.trim_end().to_string()
            }
            Err(e) => error_reply(&e, "Could not list products"),
        }
    }

    async fn remove(&self, arg: Option<&str>) -> String {
        let id = match parse_id(arg, "/remove") {
            Ok(id) => id,
            Err(reply) => return reply,
        };

        match self.manager.remove_tracking(id).await {
            Ok(product) => format!("✅ Product removed: {}", product.name),
            Err(e) => error_reply(&e, "Could not remove product"),
        }
    }

    async fn check(&self, arg: Option<&str>) -> String {
        let id = match parse_id(arg, "/check") {
            Ok(id) => id,
            Err(reply) => return reply,
        };

        let result = match self.manager.check_now(id).await {
            Ok(result) => result,
            Err(e) => return error_reply(&e, "Could not check price"),
        };

        match self.manager.get_product(id).await {
            Ok(updated) => format_check(&result, &updated),
            Err(e) => error_reply(&e, "Could not load the updated product"),
        }
    }
}

fn parse_id(arg: Option<&str>, command: &str) -> Result<i64, String> {
    let Some(arg) = arg else {
        return Err(format!(
            "❌ Wrong format.\n\nUsage: {} <id>\n\nExample: {} 1",
            command, command
        ));
    };
    arg.parse::<i64>().map_err(|_| "❌ Invalid ID.".to_string())
}

fn error_reply(error: &AppError, context: &str) -> String {
    match error {
        AppError::UnsupportedSource { .. } => {
            "❌ Unsupported URL. Only Mercado Livre product pages are supported.".to_string()
        }
        AppError::DuplicateTracking { .. } => "❌ This product is already being tracked.".to_string(),
        AppError::NotFound { .. } => "❌ Product not found.".to_string(),
        AppError::Validation(message) => format!("❌ {}", message),
        other => format!("❌ {}: {}", context, other),
    }
}

/// Promotion line for a stored product, if it is on sale.
fn promotion_line(product: &TrackedProduct) -> Option<String> {
    let discount = product.displayed_discount();
    if discount <= 0.0 {
        return None;
    }
    Some(if product.original_price > 0.0 {
        format!("🎉 {:.1}% OFF (was {})", discount, format_brl(product.original_price))
    } else {
        format!("🎉 {:.1}% OFF", discount)
    })
}

pub fn format_product_entry(product: &TrackedProduct) -> String {
    let mut entry = format!("🆔 ID: {}\n📦 {}\n", product.id, product.name);

    if product.has_been_checked() {
        entry.push_str(&format!("💰 Current price: {}\n", format_brl(product.current_price)));
        if let Some(line) = promotion_line(product) {
            entry.push_str(&line);
            entry.push('\n');
        }
    } else {
        entry.push_str("💰 Current price: not checked yet\n");
    }

    if product.has_price_target() {
        let gap = product.current_price - product.target_price;
        if product.target_price_met() {
            entry.push_str(&format!("🎯 Target price: {} ✅ TARGET REACHED!\n", format_brl(product.target_price)));
        } else if product.has_been_checked() {
            entry.push_str(&format!(
                "🎯 Target price: {} ({} to go, {:.1}% above)\n",
                format_brl(product.target_price),
                format_brl(gap),
                gap / product.target_price * 100.0
            ));
        } else {
            entry.push_str(&format!("🎯 Target price: {}\n", format_brl(product.target_price)));
        }
    }

    if product.has_discount_target() {
        entry.push_str(&format!("🎯 Target discount: {:.1}%\n", product.target_discount_percent));
    }

    match product.last_checked_at {
        Some(at) => entry.push_str(&format!("🕐 Last checked: {}\n", at.format("%d/%m/%Y %H:%M"))),
        None => entry.push_str("🕐 Last checked: never\n"),
    }

    entry.push_str(&format!("🔗 {}\n", product.url));
    entry
}

fn format_added(outcome: &AddTrackingOutcome) -> String {
    let product = &outcome.product;
    let mut reply = format!(
        "✅ Product added!\n\nName: {}\nURL: {}",
        product.name, product.url
    );

    match &outcome.observation {
        Some(observation) => {
            reply.push_str(&format!("\nCurrent price: {}", format_brl(observation.price)));
            if let Some(line) = promotion_line(product) {
                reply.push_str(&format!("\n{}", line));
            } else if product.has_price_target() && observation.price < product.target_price {
                reply.push_str(&format!(
                    "\n🎉 Already below the target price! {:.1}% under it",
                    percent_below(product.target_price, observation.price)
                ));
            } else if product.has_price_target() && observation.price > product.target_price {
                reply.push_str(&format!(
                    "\n💡 {} to go until the target price",
                    format_brl(observation.price - product.target_price)
                ));
            }
        }
        None => reply.push_str("\nCurrent price: not available yet, it will be read on the next check"),
    }

    if product.has_price_target() {
        reply.push_str(&format!("\nTarget price: {}", format_brl(product.target_price)));
    }
    if product.has_discount_target() {
        reply.push_str(&format!("\nTarget discount: {:.1}%", product.target_discount_percent));
    }
    reply
}

fn format_check(result: &ProductCheckResult, updated: &TrackedProduct) -> String {
    let previous = &result.previous;
    let mut reply = format!(
        "📊 Product: {}\n\nCurrent price: {}\nPrevious price: {}\nLink: {}",
        updated.name,
        format_brl(result.price()),
        format_brl(previous.current_price),
        updated.url
    );

    if let Some(line) = promotion_line(updated) {
        reply.push_str(&format!("\n\n{}", line));
    } else if previous.has_been_checked() && result.price() < previous.current_price {
        reply.push_str(&format!(
            "\n\n🎉 Down {:.1}%!",
            percent_below(previous.current_price, result.price())
        ));
    }

    if updated.target_price_met() {
        reply.push_str(&format!(
            "\n\n✅ Below the target price! {:.1}% under it",
            percent_below(updated.target_price, updated.current_price)
        ));
    }

    if result.notified {
        reply.push_str("\n\n🔔 Promotion alert sent.");
    }
    reply
}
