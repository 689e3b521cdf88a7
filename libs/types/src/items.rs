//! Canonical items
//!
//! Every payload a venue returns is turned into one [`Item`] variant. All variants share an
//! [`Identity`]; two items are the same item when venue, item id, timestamp and symbol all
//! match, no matter what their payload says.
//!
//! Fields are filled by name through [`Item::set_field`] so the conversion engine never needs
//! to know the concrete struct it is building. Nested collections (order book sides, account
//! balances) are attached with [`Item::set_nested`] after being built from their own field map.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::TypesError;
use crate::params::{Direction, Interval, OrderStatus, OrderType, ParamName};
use crate::venue::VenueId;

/// Fields shared by every item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub venue: Option<VenueId>,
    pub symbol: Option<String>,
    /// In the client's configured unit (seconds or milliseconds)
    pub timestamp: Option<i64>,
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(flatten)]
    pub identity: Identity,
    pub price: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub direction: Option<Direction>,
}

/// Trade executed by the authenticated account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MyTrade {
    #[serde(flatten)]
    pub trade: Trade,
    pub order_id: Option<String>,
    pub fee: Option<Decimal>,
    pub rebate: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(flatten)]
    pub identity: Identity,
    pub interval: Option<Interval>,
    pub price_open: Option<Decimal>,
    pub price_high: Option<Decimal>,
    pub price_low: Option<Decimal>,
    pub price_close: Option<Decimal>,
    /// Traded volume over the interval
    pub amount: Option<Decimal>,
    pub trades_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    #[serde(flatten)]
    pub identity: Identity,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    #[serde(flatten)]
    pub identity: Identity,
    pub asks: Vec<OrderBookItem>,
    pub bids: Vec<OrderBookItem>,
}

/// One price level of an order book side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookItem {
    #[serde(flatten)]
    pub identity: Identity,
    pub price: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub direction: Option<Direction>,
    pub order_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(flatten)]
    pub identity: Identity,
    pub balances: Vec<Balance>,
}

/// Holdings of one asset; the asset is the identity symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(flatten)]
    pub identity: Identity,
    pub amount_available: Option<Decimal>,
    pub amount_reserved: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(flatten)]
    pub identity: Identity,
    pub user_order_id: Option<String>,
    pub order_type: Option<OrderType>,
    pub price: Option<Decimal>,
    pub amount_original: Option<Decimal>,
    pub amount_executed: Option<Decimal>,
    pub direction: Option<Direction>,
    pub order_status: Option<OrderStatus>,
}

/// Item class, used to select a field map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Trade,
    MyTrade,
    Candle,
    Ticker,
    OrderBook,
    OrderBookItem,
    Account,
    Balance,
    Order,
}

impl ItemKind {
    /// Empty item of this class
    pub fn empty(self) -> Item {
        match self {
            ItemKind::Trade => Item::Trade(Trade::default()),
            ItemKind::MyTrade => Item::MyTrade(MyTrade::default()),
            ItemKind::Candle => Item::Candle(Candle::default()),
            ItemKind::Ticker => Item::Ticker(Ticker::default()),
            ItemKind::OrderBook => Item::OrderBook(OrderBook::default()),
            ItemKind::OrderBookItem => Item::OrderBookItem(OrderBookItem::default()),
            ItemKind::Account => Item::Account(Account::default()),
            ItemKind::Balance => Item::Balance(Balance::default()),
            ItemKind::Order => Item::Order(Order::default()),
        }
    }

    /// Class of the items nested under `field`, if the field is a nested collection
    pub fn nested_kind(self, field: &ParamName) -> Option<ItemKind> {
        match (self, field) {
            (ItemKind::OrderBook, ParamName::Asks | ParamName::Bids) => {
                Some(ItemKind::OrderBookItem)
            }
            (ItemKind::Account, ParamName::Balances) => Some(ItemKind::Balance),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Trade => "trade",
            ItemKind::MyTrade => "my_trade",
            ItemKind::Candle => "candle",
            ItemKind::Ticker => "ticker",
            ItemKind::OrderBook => "order_book",
            ItemKind::OrderBookItem => "order_book_item",
            ItemKind::Account => "account",
            ItemKind::Balance => "balance",
            ItemKind::Order => "order",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any canonical item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Trade(Trade),
    MyTrade(MyTrade),
    Candle(Candle),
    Ticker(Ticker),
    OrderBook(OrderBook),
    OrderBookItem(OrderBookItem),
    Account(Account),
    Balance(Balance),
    Order(Order),
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Trade(_) => ItemKind::Trade,
            Item::MyTrade(_) => ItemKind::MyTrade,
            Item::Candle(_) => ItemKind::Candle,
            Item::Ticker(_) => ItemKind::Ticker,
            Item::OrderBook(_) => ItemKind::OrderBook,
            Item::OrderBookItem(_) => ItemKind::OrderBookItem,
            Item::Account(_) => ItemKind::Account,
            Item::Balance(_) => ItemKind::Balance,
            Item::Order(_) => ItemKind::Order,
        }
    }

    pub fn identity(&self) -> &Identity {
        match self {
            Item::Trade(item) => &item.identity,
            Item::MyTrade(item) => &item.trade.identity,
            Item::Candle(item) => &item.identity,
            Item::Ticker(item) => &item.identity,
            Item::OrderBook(item) => &item.identity,
            Item::OrderBookItem(item) => &item.identity,
            Item::Account(item) => &item.identity,
            Item::Balance(item) => &item.identity,
            Item::Order(item) => &item.identity,
        }
    }

    pub fn identity_mut(&mut self) -> &mut Identity {
        match self {
            Item::Trade(item) => &mut item.identity,
            Item::MyTrade(item) => &mut item.trade.identity,
            Item::Candle(item) => &mut item.identity,
            Item::Ticker(item) => &mut item.identity,
            Item::OrderBook(item) => &mut item.identity,
            Item::OrderBookItem(item) => &mut item.identity,
            Item::Account(item) => &mut item.identity,
            Item::Balance(item) => &mut item.identity,
            Item::Order(item) => &mut item.identity,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        self.identity().symbol.as_deref()
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.identity().timestamp
    }

    pub fn item_id(&self) -> Option<&str> {
        self.identity().item_id.as_deref()
    }

    /// Store a raw venue value under a canonical field name
    ///
    /// Returns `Ok(false)` when this item class has no such scalar field. Timestamps must
    /// already be in the client's unit; nested collections go through [`Item::set_nested`].
    pub fn set_field(&mut self, name: &ParamName, raw: &Value) -> Result<bool, TypesError> {
        if raw.is_null() {
            return Ok(self.field(name).is_some());
        }
        match name {
            ParamName::Symbol => {
                self.identity_mut().symbol = Some(text(raw));
                return Ok(true);
            }
            ParamName::Timestamp => {
                self.identity_mut().timestamp = Some(integer(name, raw)?);
                return Ok(true);
            }
            ParamName::ItemId => {
                self.identity_mut().item_id = Some(text(raw));
                return Ok(true);
            }
            _ => {}
        }

        match self {
            Item::Trade(trade) => trade.set_field(name, raw),
            Item::MyTrade(my_trade) => match name {
                ParamName::OrderId => {
                    my_trade.order_id = Some(text(raw));
                    Ok(true)
                }
                ParamName::Fee => {
                    my_trade.fee = Some(decimal(name, raw)?);
                    Ok(true)
                }
                ParamName::Rebate => {
                    my_trade.rebate = Some(decimal(name, raw)?);
                    Ok(true)
                }
                _ => my_trade.trade.set_field(name, raw),
            },
            Item::Candle(candle) => {
                match name {
                    ParamName::Interval => candle.interval = Some(token(name, raw)?),
                    ParamName::PriceOpen => candle.price_open = Some(decimal(name, raw)?),
                    ParamName::PriceHigh => candle.price_high = Some(decimal(name, raw)?),
                    ParamName::PriceLow => candle.price_low = Some(decimal(name, raw)?),
                    ParamName::PriceClose => candle.price_close = Some(decimal(name, raw)?),
                    ParamName::Amount => candle.amount = Some(decimal(name, raw)?),
                    ParamName::TradesCount => candle.trades_count = Some(count(name, raw)?),
                    _ => return Ok(false),
                }
                Ok(true)
            }
            Item::Ticker(ticker) => match name {
                ParamName::Price => {
                    ticker.price = Some(decimal(name, raw)?);
                    Ok(true)
                }
                _ => Ok(false),
            },
            Item::OrderBook(_) | Item::Account(_) => Ok(false),
            Item::OrderBookItem(level) => {
                match name {
                    ParamName::Price => level.price = Some(decimal(name, raw)?),
                    ParamName::Amount => level.amount = Some(decimal(name, raw)?),
                    ParamName::Direction => level.direction = Some(token(name, raw)?),
                    ParamName::OrderCount => level.order_count = Some(count(name, raw)?),
                    _ => return Ok(false),
                }
                Ok(true)
            }
            Item::Balance(balance) => {
                match name {
                    ParamName::AmountAvailable => {
                        balance.amount_available = Some(decimal(name, raw)?)
                    }
                    ParamName::AmountReserved => {
                        balance.amount_reserved = Some(decimal(name, raw)?)
                    }
                    _ => return Ok(false),
                }
                Ok(true)
            }
            Item::Order(order) => {
                match name {
                    ParamName::UserOrderId => order.user_order_id = Some(text(raw)),
                    ParamName::OrderType => order.order_type = Some(token(name, raw)?),
                    ParamName::Price => order.price = Some(decimal(name, raw)?),
                    ParamName::AmountOriginal => {
                        order.amount_original = Some(decimal(name, raw)?)
                    }
                    ParamName::AmountExecuted => {
                        order.amount_executed = Some(decimal(name, raw)?)
                    }
                    ParamName::Direction => order.direction = Some(token(name, raw)?),
                    ParamName::OrderStatus => order.order_status = Some(token(name, raw)?),
                    _ => return Ok(false),
                }
                Ok(true)
            }
        }
    }

    /// Attach nested items built from their own field map
    ///
    /// Items of the wrong class are discarded. Returns `false` if `name` is not a nested
    /// collection of this item class.
    pub fn set_nested(&mut self, name: &ParamName, items: Vec<Item>) -> bool {
        match (self, name) {
            (Item::OrderBook(book), ParamName::Asks) => {
                book.asks = items.into_iter().filter_map(Item::into_order_book_item).collect();
                true
            }
            (Item::OrderBook(book), ParamName::Bids) => {
                book.bids = items.into_iter().filter_map(Item::into_order_book_item).collect();
                true
            }
            (Item::Account(account), ParamName::Balances) => {
                account.balances = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Item::Balance(balance) => Some(balance),
                        _ => None,
                    })
                    .collect();
                true
            }
            _ => false,
        }
    }

    /// Value of a canonical field as JSON
    ///
    /// `None` means the class has no such field, `Some(Value::Null)` that it is unset.
    pub fn field(&self, name: &ParamName) -> Option<Value> {
        let identity = self.identity();
        match name {
            ParamName::PlatformId => {
                return Some(identity.venue.map_or(Value::Null, |v| Value::from(v.id())))
            }
            ParamName::Symbol => return Some(opt_text(&identity.symbol)),
            ParamName::Timestamp => return Some(identity.timestamp.map_or(Value::Null, Value::from)),
            ParamName::ItemId => return Some(opt_text(&identity.item_id)),
            _ => {}
        }

        match self {
            Item::Trade(trade) => trade.field(name),
            Item::MyTrade(my_trade) => match name {
                ParamName::OrderId => Some(opt_text(&my_trade.order_id)),
                ParamName::Fee => Some(opt_decimal(my_trade.fee)),
                ParamName::Rebate => Some(opt_decimal(my_trade.rebate)),
                _ => my_trade.trade.field(name),
            },
            Item::Candle(candle) => match name {
                ParamName::Interval => Some(opt_token(candle.interval.map(|v| v.as_str()))),
                ParamName::PriceOpen => Some(opt_decimal(candle.price_open)),
                ParamName::PriceHigh => Some(opt_decimal(candle.price_high)),
                ParamName::PriceLow => Some(opt_decimal(candle.price_low)),
                ParamName::PriceClose => Some(opt_decimal(candle.price_close)),
                ParamName::Amount => Some(opt_decimal(candle.amount)),
                ParamName::TradesCount => Some(candle.trades_count.map_or(Value::Null, Value::from)),
                _ => None,
            },
            Item::Ticker(ticker) => match name {
                ParamName::Price => Some(opt_decimal(ticker.price)),
                _ => None,
            },
            Item::OrderBook(book) => match name {
                ParamName::Asks => Some(nested_json(&book.asks)),
                ParamName::Bids => Some(nested_json(&book.bids)),
                _ => None,
            },
            Item::OrderBookItem(level) => match name {
                ParamName::Price => Some(opt_decimal(level.price)),
                ParamName::Amount => Some(opt_decimal(level.amount)),
                ParamName::Direction => Some(opt_token(level.direction.map(|v| v.as_str()))),
                ParamName::OrderCount => Some(level.order_count.map_or(Value::Null, Value::from)),
                _ => None,
            },
            Item::Account(account) => match name {
                ParamName::Balances => Some(nested_json(&account.balances)),
                _ => None,
            },
            Item::Balance(balance) => match name {
                ParamName::AmountAvailable => Some(opt_decimal(balance.amount_available)),
                ParamName::AmountReserved => Some(opt_decimal(balance.amount_reserved)),
                _ => None,
            },
            Item::Order(order) => match name {
                ParamName::UserOrderId => Some(opt_text(&order.user_order_id)),
                ParamName::OrderType => Some(opt_token(order.order_type.map(|v| v.as_str()))),
                ParamName::Price => Some(opt_decimal(order.price)),
                ParamName::AmountOriginal => Some(opt_decimal(order.amount_original)),
                ParamName::AmountExecuted => Some(opt_decimal(order.amount_executed)),
                ParamName::Direction => Some(opt_token(order.direction.map(|v| v.as_str()))),
                ParamName::OrderStatus => Some(opt_token(order.order_status.map(|v| v.as_str()))),
                _ => None,
            },
        }
    }

    /// Whether the class has `name` as a field at all
    pub fn has_field(&self, name: &ParamName) -> bool {
        self.field(name).is_some()
    }

    pub fn as_trade(&self) -> Option<&Trade> {
        match self {
            Item::Trade(trade) => Some(trade),
            Item::MyTrade(my_trade) => Some(&my_trade.trade),
            _ => None,
        }
    }

    pub fn as_candle(&self) -> Option<&Candle> {
        match self {
            Item::Candle(candle) => Some(candle),
            _ => None,
        }
    }

    pub fn as_ticker(&self) -> Option<&Ticker> {
        match self {
            Item::Ticker(ticker) => Some(ticker),
            _ => None,
        }
    }

    pub fn as_order_book(&self) -> Option<&OrderBook> {
        match self {
            Item::OrderBook(book) => Some(book),
            _ => None,
        }
    }

    pub fn as_account(&self) -> Option<&Account> {
        match self {
            Item::Account(account) => Some(account),
            _ => None,
        }
    }

    pub fn as_order(&self) -> Option<&Order> {
        match self {
            Item::Order(order) => Some(order),
            _ => None,
        }
    }

    fn into_order_book_item(self) -> Option<OrderBookItem> {
        match self {
            Item::OrderBookItem(level) => Some(level),
            _ => None,
        }
    }

    fn identity_key(&self) -> (Option<VenueId>, Option<&str>, Option<i64>, Option<&str>) {
        let identity = self.identity();
        (
            identity.venue,
            identity.item_id.as_deref(),
            identity.timestamp,
            identity.symbol.as_deref(),
        )
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.identity_key() == other.identity_key()
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity_key().hash(state);
    }
}

impl Trade {
    fn set_field(&mut self, name: &ParamName, raw: &Value) -> Result<bool, TypesError> {
        match name {
            ParamName::Price => self.price = Some(decimal(name, raw)?),
            ParamName::Amount => self.amount = Some(decimal(name, raw)?),
            ParamName::Direction => self.direction = Some(token(name, raw)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn field(&self, name: &ParamName) -> Option<Value> {
        match name {
            ParamName::Price => Some(opt_decimal(self.price)),
            ParamName::Amount => Some(opt_decimal(self.amount)),
            ParamName::Direction => Some(opt_token(self.direction.map(|v| v.as_str()))),
            _ => None,
        }
    }
}

fn invalid(name: &ParamName, raw: &Value) -> TypesError {
    TypesError::InvalidFieldValue {
        field: name.to_string(),
        value: raw.to_string(),
    }
}

fn text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decimal from a JSON string or number, accepting scientific notation
fn decimal(name: &ParamName, raw: &Value) -> Result<Decimal, TypesError> {
    let repr = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(invalid(name, raw)),
    };
    Decimal::from_str(&repr)
        .or_else(|_| Decimal::from_scientific(&repr))
        .map_err(|_| invalid(name, raw))
}

fn integer(name: &ParamName, raw: &Value) -> Result<i64, TypesError> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| invalid(name, raw)),
        Value::String(s) => s.trim().parse().map_err(|_| invalid(name, raw)),
        _ => Err(invalid(name, raw)),
    }
}

fn count(name: &ParamName, raw: &Value) -> Result<u64, TypesError> {
    let value = integer(name, raw)?;
    u64::try_from(value).map_err(|_| invalid(name, raw))
}

fn token<T: FromStr>(name: &ParamName, raw: &Value) -> Result<T, TypesError> {
    raw.as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid(name, raw))
}

fn opt_text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::String)
}

fn opt_decimal(value: Option<Decimal>) -> Value {
    value.map_or(Value::Null, |d| Value::String(d.to_string()))
}

fn opt_token(value: Option<&'static str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}

fn nested_json<T: Serialize>(items: &[T]) -> Value {
    serde_json::to_value(items).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::collections::HashSet;

    fn trade(id: &str, ts: i64) -> Item {
        let mut item = ItemKind::Trade.empty();
        item.identity_mut().venue = Some(VenueId::Binance);
        item.identity_mut().symbol = Some("ETHBTC".into());
        item.identity_mut().timestamp = Some(ts);
        item.identity_mut().item_id = Some(id.into());
        item
    }

    #[test]
    fn test_identity_equality_ignores_payload() {
        let a = trade("1", 100);
        let mut b = trade("1", 100);
        b.set_field(&ParamName::Price, &json!("1.5")).unwrap();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        set.insert(trade("2", 100));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_set_field_coerces_venue_values() {
        let mut item = ItemKind::Trade.empty();
        assert!(item.set_field(&ParamName::Price, &json!(6760.7)).unwrap());
        assert!(item.set_field(&ParamName::Amount, &json!("0.086154")).unwrap());
        assert!(item.set_field(&ParamName::Direction, &json!("Sell")).unwrap());
        assert!(item.set_field(&ParamName::ItemId, &json!(305430435)).unwrap());
        assert!(!item.set_field(&ParamName::PriceOpen, &json!("1")).unwrap());

        let trade = item.as_trade().unwrap();
        assert_eq!(trade.price, Some(dec!(6760.7)));
        assert_eq!(trade.amount, Some(dec!(0.086154)));
        assert_eq!(trade.direction, Some(Direction::Sell));
        assert_eq!(item.item_id(), Some("305430435"));
    }

    #[test]
    fn test_set_field_rejects_garbage() {
        let mut item = ItemKind::Candle.empty();
        assert!(item.set_field(&ParamName::PriceHigh, &json!("abc")).is_err());
        assert!(item.set_field(&ParamName::TradesCount, &json!(-1)).is_err());
    }

    #[test]
    fn test_nested_items_by_variant() {
        let mut book = ItemKind::OrderBook.empty();
        let mut level = ItemKind::OrderBookItem.empty();
        level.set_field(&ParamName::Price, &json!("10.0")).unwrap();
        assert!(book.set_nested(&ParamName::Asks, vec![level, ItemKind::Trade.empty()]));
        assert!(!book.set_nested(&ParamName::Balances, vec![]));
        assert_eq!(book.as_order_book().unwrap().asks.len(), 1);

        assert_eq!(
            ItemKind::Account.nested_kind(&ParamName::Balances),
            Some(ItemKind::Balance)
        );
        assert_eq!(ItemKind::Trade.nested_kind(&ParamName::Asks), None);
    }

    #[test]
    fn test_field_distinguishes_unset_from_unknown() {
        let item = ItemKind::Ticker.empty();
        assert_eq!(item.field(&ParamName::Price), Some(Value::Null));
        assert_eq!(item.field(&ParamName::Interval), None);
        assert!(item.has_field(&ParamName::Symbol));
    }
}
