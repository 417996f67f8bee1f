//! プロンプト生成モジュール
//!
//! 請求書抽出用の指示文とレスポンススキーマ:
//! - build_extraction_prompt: 画像枚数に応じた指示文
//! - invoice_response_schema: Gemini responseSchema（型名は大文字表記）

use serde_json::{json, Value};

/// 自国通貨（抽出結果は常にこの通貨コードに統一する）
pub const DEFAULT_HOME_CURRENCY: &str = "SAR";

/// 抽出プロンプト生成
///
/// # Arguments
/// * `page_count` - 送信する画像枚数。2枚以上は1件の請求書の複数ページとして扱う
pub fn build_extraction_prompt(page_count: usize) -> String {
    let pages = if page_count > 1 {
        format!(
            "الصور المرفقة ({page_count} صور) هي صفحات فاتورة واحدة بالترتيب. ادمج بيانات جميع الصفحات في فاتورة واحدة."
        )
    } else {
        "الصورة المرفقة هي فاتورة واحدة.".to_string()
    };

    format!(
        r#"قم بتحليل صور الفاتورة واستخرج البيانات المطلوبة.
{pages}

استخرج الحقول التالية:
- companyName: اسم الشركة أو المتجر المصدر للفاتورة
- taxId: الرقم الضريبي
- invoiceNumber: رقم الفاتورة
- invoiceDate: تاريخ الفاتورة
- subtotal: الإجمالي قبل الضريبة
- tax: قيمة الضريبة
- total: الإجمالي النهائي
- currency: العملة
- items: قائمة الأصناف (name, quantity, price, tax, total)

أعد كائن JSON واحدًا فقط مطابقًا للمخطط، بدون أي نص إضافي."#
    )
}

/// Gemini用レスポンススキーマ
pub fn invoice_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "companyName": { "type": "STRING" },
            "taxId": { "type": "STRING" },
            "invoiceDate": { "type": "STRING" },
            "invoiceNumber": { "type": "STRING" },
            "subtotal": { "type": "NUMBER" },
            "tax": { "type": "NUMBER" },
            "total": { "type": "NUMBER" },
            "currency": { "type": "STRING" },
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "quantity": { "type": "NUMBER" },
                        "price": { "type": "NUMBER" },
                        "tax": { "type": "NUMBER" },
                        "total": { "type": "NUMBER" }
                    },
                    "required": ["name", "quantity", "price"]
                }
            }
        },
        "required": ["companyName", "total", "items"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_single_page() {
        let prompt = build_extraction_prompt(1);
        assert!(prompt.contains("فاتورة واحدة"));
        assert!(!prompt.contains("صفحات"));
        assert!(prompt.contains("companyName"));
    }

    #[test]
    fn test_prompt_multi_page_mentions_count() {
        let prompt = build_extraction_prompt(3);
        assert!(prompt.contains("3 صور"));
        assert!(prompt.contains("صفحات"));
    }

    #[test]
    fn test_schema_required_fields() {
        let schema = invoice_response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["companyName", "total", "items"]);
        assert_eq!(schema["properties"]["items"]["items"]["required"][2], "price");
    }
}
