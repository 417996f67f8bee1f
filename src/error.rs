use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoiceAiError {
    #[error("خطأ في الإعدادات: {0}")]
    Config(String),

    #[error("مفتاح Gemini API غير مضبوط. استخدم `invoice-ai config --set-api-key YOUR_KEY` أو متغير البيئة GEMINI_API_KEY")]
    MissingApiKey,

    #[error("ملف بيانات اعتماد Google غير مضبوط. استخدم `invoice-ai config --set-client-secret PATH`")]
    MissingClientSecret,

    #[error("لم يتم الربط بحساب Google")]
    NotAuthorized,

    #[error("الملف غير موجود: {0}")]
    FileNotFound(String),

    #[error("الملف {0} ليس صورة. يرجى تحميل صور فقط.")]
    NotAnImage(String),

    #[error("لم يتم العثور على صور: {0}")]
    NoImagesFound(String),

    /// 抽出失敗（モデル呼び出し失敗・空レスポンス・スキーマ不一致）
    #[error("{0}")]
    Extraction(String),

    /// クラウド保存失敗（フォルダ・台帳・アップロード・行追加のいずれか）
    #[error("حدث خطأ أثناء الحفظ في Google Cloud: {0}")]
    CloudSync(String),

    #[error("يوجد تحليل قيد التنفيذ")]
    Busy,

    #[error("لا توجد ملفات للتحليل")]
    NoFiles,

    #[error("لا توجد نتائج للتصدير أو الحفظ")]
    NoResults,

    #[error("خطأ في إنشاء ملف Excel: {0}")]
    ExcelGeneration(String),

    #[error("خطأ في تحليل JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("خطأ IO: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] invoice_ai_common::Error),
}

pub type Result<T> = std::result::Result<T, InvoiceAiError>;
