//! Internationalization (i18n) of the runner's user-facing messages.

use crate::agent::Lang;

/// UI messages structure
#[derive(Debug, Clone)]
pub struct Messages {
    pub executing_task: &'static str,
    pub task_result: &'static str,
    pub task_completed: &'static str,
    pub task_failed: &'static str,
    pub error: &'static str,
    pub timed_out: &'static str,
    pub output_saved: &'static str,
    pub supported_apps: &'static str,
    pub endpoint_ok: &'static str,
    pub endpoint_failed: &'static str,
    pub model_not_listed: &'static str,
    pub settings_saved: &'static str,
    pub interactive_hint: &'static str,
    pub task_prompt: &'static str,
    pub goodbye: &'static str,
}

/// Chinese messages
pub static MESSAGES_ZH: Messages = Messages {
    executing_task: "执行任务",
    task_result: "任务结果",
    task_completed: "任务完成",
    task_failed: "任务执行失败",
    error: "错误",
    timed_out: "执行超时",
    output_saved: "输出已保存到",
    supported_apps: "支持的应用",
    endpoint_ok: "接口连接成功",
    endpoint_failed: "接口连接失败",
    model_not_listed: "接口未列出该模型",
    settings_saved: "设置已保存到",
    interactive_hint: "交互模式：输入任务后按回车，输入 quit 或 exit 退出。",
    task_prompt: "任务",
    goodbye: "再见！",
};

/// English messages
pub static MESSAGES_EN: Messages = Messages {
    executing_task: "Executing task",
    task_result: "Task result",
    task_completed: "Task completed",
    task_failed: "Task failed",
    error: "Error",
    timed_out: "Timed out",
    output_saved: "Output saved to",
    supported_apps: "Supported apps",
    endpoint_ok: "Endpoint reachable",
    endpoint_failed: "Endpoint check failed",
    model_not_listed: "Endpoint does not list the model",
    settings_saved: "Settings saved to",
    interactive_hint: "Interactive mode. Type your task and press Enter, 'quit' or 'exit' to leave.",
    task_prompt: "Task",
    goodbye: "Goodbye!",
};

/// Get UI messages by language.
pub fn get_messages(lang: Lang) -> &'static Messages {
    match lang {
        Lang::En => &MESSAGES_EN,
        Lang::Cn => &MESSAGES_ZH,
    }
}
