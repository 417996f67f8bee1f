//! 請求書データの型定義
//!
//! CLIとクラウド保存で共有される型:
//! - InvoiceLineItem: 明細行
//! - InvoiceRecord: AI抽出結果（1回の抽出呼び出しにつき1件）

use serde::{Deserialize, Deserializer, Serialize};

/// `null` は既定値として読む
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// 明細行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineItem {
    pub name: String,

    pub quantity: f64,

    #[serde(rename = "price")]
    pub unit_price: f64,

    #[serde(rename = "tax", default, skip_serializing_if = "Option::is_none")]
    pub item_tax: Option<f64>,

    #[serde(rename = "total", default, skip_serializing_if = "Option::is_none")]
    pub item_total: Option<f64>,
}

impl InvoiceLineItem {
    /// 明細税額（未記載は0）
    pub fn tax_or_zero(&self) -> f64 {
        self.item_tax.unwrap_or(0.0)
    }

    /// 明細合計
    ///
    /// AIが合計を返さなかった場合は `数量 × 単価 + 税額` で算出する
    pub fn total(&self) -> f64 {
        self.item_total
            .unwrap_or_else(|| self.quantity * self.unit_price + self.tax_or_zero())
    }
}

/// AI抽出結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub company_name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tax_id: String,           // 税番号

    #[serde(default, deserialize_with = "null_as_default")]
    pub invoice_number: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub invoice_date: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub subtotal: f64,            // 税抜合計

    #[serde(default, deserialize_with = "null_as_default")]
    pub tax: f64,

    pub total: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub currency: String,

    pub items: Vec<InvoiceLineItem>,
}

impl InvoiceRecord {
    /// 通貨コードを置き換えたレコードを返す
    ///
    /// 抽出クライアントは請求書の記載に関係なく自国通貨に統一する
    pub fn with_currency(self, currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_total_derived() {
        let item = InvoiceLineItem {
            name: "ورق A4".to_string(),
            quantity: 3.0,
            unit_price: 10.0,
            item_tax: Some(2.0),
            item_total: None,
        };
        assert_eq!(item.total(), 32.0);
    }

    #[test]
    fn test_line_item_total_without_tax() {
        let item = InvoiceLineItem {
            name: "قلم".to_string(),
            quantity: 4.0,
            unit_price: 2.5,
            ..Default::default()
        };
        assert_eq!(item.total(), 10.0);
        assert_eq!(item.tax_or_zero(), 0.0);
    }

    #[test]
    fn test_line_item_explicit_total_wins() {
        let item = InvoiceLineItem {
            name: "خدمة".to_string(),
            quantity: 1.0,
            unit_price: 100.0,
            item_tax: Some(15.0),
            item_total: Some(110.0),
        };
        assert_eq!(item.total(), 110.0);
    }

    #[test]
    fn test_invoice_record_deserialize() {
        let json = r#"{
            "companyName": "شركة النور",
            "taxId": "300123456700003",
            "invoiceNumber": "INV-77",
            "invoiceDate": "2025-03-01",
            "subtotal": 100,
            "tax": 15,
            "total": 115,
            "currency": "USD",
            "items": [{"name": "خدمة", "quantity": 1, "price": 100, "tax": 15}]
        }"#;

        let record: InvoiceRecord = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(record.company_name, "شركة النور");
        assert_eq!(record.tax_id, "300123456700003");
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.items[0].unit_price, 100.0);
        assert_eq!(record.items[0].item_tax, Some(15.0));
        assert_eq!(record.items[0].item_total, None);
    }

    #[test]
    fn test_invoice_record_deserialize_missing_fields() {
        // スキーマ必須項目（companyName, total, items）のみ
        let json = r#"{"companyName": "متجر", "total": 50, "items": []}"#;

        let record: InvoiceRecord = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(record.company_name, "متجر");
        assert_eq!(record.tax_id, ""); // デフォルト値
        assert_eq!(record.subtotal, 0.0); // デフォルト値
        assert!(record.items.is_empty());
    }

    #[test]
    fn test_invoice_record_missing_required_field() {
        let json = r#"{"companyName": "متجر", "items": []}"#;
        assert!(serde_json::from_str::<InvoiceRecord>(json).is_err());
    }

    #[test]
    fn test_invoice_record_serialize_wire_names() {
        let record = InvoiceRecord {
            company_name: "شركة".to_string(),
            tax_id: "123".to_string(),
            total: 10.0,
            items: vec![InvoiceLineItem {
                name: "x".to_string(),
                quantity: 1.0,
                unit_price: 10.0,
                ..Default::default()
            }],
            ..Default::default()
        };

        let json = serde_json::to_string(&record).expect("シリアライズ失敗");
        assert!(json.contains("\"companyName\":\"شركة\""));
        assert!(json.contains("\"taxId\":\"123\""));
        assert!(json.contains("\"price\":10.0"));
        assert!(!json.contains("\"unitPrice\""));
    }

    #[test]
    fn test_with_currency_overrides() {
        let record = InvoiceRecord {
            currency: "USD".to_string(),
            ..Default::default()
        };
        assert_eq!(record.with_currency("SAR").currency, "SAR");
    }

    #[test]
    fn test_invoice_record_null_optionals() {
        let json = r#"{
            "companyName": "مؤسسة",
            "taxId": null,
            "invoiceNumber": null,
            "invoiceDate": null,
            "subtotal": null,
            "tax": null,
            "total": 20,
            "currency": null,
            "items": [{"name": "x", "quantity": 2, "price": 10, "tax": null, "total": null}]
        }"#;

        let record: InvoiceRecord = serde_json::from_str(json).expect("null をデシリアライズできない");
        assert_eq!(record.tax_id, "");
        assert_eq!(record.invoice_number, "");
        assert_eq!(record.invoice_date, "");
        assert_eq!(record.subtotal, 0.0);
        assert_eq!(record.tax, 0.0);
        assert_eq!(record.currency, "");
        assert_eq!(record.items[0].total(), 20.0);
    }

    #[test]
    fn test_line_item_requires_quantity_and_price() {
        let no_price = r#"{"companyName": "a", "total": 1, "items": [{"name": "x", "quantity": 1}]}"#;
        let no_quantity = r#"{"companyName": "a", "total": 1, "items": [{"name": "x", "price": 1}]}"#;
        assert!(serde_json::from_str::<InvoiceRecord>(no_price).is_err());
        assert!(serde_json::from_str::<InvoiceRecord>(no_quantity).is_err());
    }
}
